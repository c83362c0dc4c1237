/// Distinguishes accesses made by the emulated program from ones made by debugging tools, which
/// must never change state as a side effect of reading.
pub trait AccessType {
    const IS_DEBUG: bool;
}

pub struct CpuAccess;

impl AccessType for CpuAccess {
    const IS_DEBUG: bool = false;
}

pub struct DebugAccess;

impl AccessType for DebugAccess {
    const IS_DEBUG: bool = true;
}
