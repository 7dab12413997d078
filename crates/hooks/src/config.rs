use tinyevm_primitives::Address;

/// Controls which frames the hook records. When `enabled` and `target_address` is the zero
/// address, every frame is recorded; when `target_address` is set, only frames whose executing
/// code lives at that address contribute coverage or findings. The per-pass toggles below are an
/// additional knob a fuzzer can use to cut per-step cost when it only cares about one bug class;
/// they default to on so `InstrumentConfig::default()` matches "record everything".
#[derive(Debug, Clone, Copy)]
pub struct InstrumentConfig {
    pub enabled: bool,
    pub target_address: Address,
    pub detect_integer_overflow: bool,
    pub detect_suspicious_calls: bool,
    pub detect_selfdestruct: bool,
    pub detect_reentrancy: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_address: Address::ZERO,
            detect_integer_overflow: true,
            detect_suspicious_calls: true,
            detect_selfdestruct: true,
            detect_reentrancy: true,
        }
    }
}

impl InstrumentConfig {
    pub fn records(&self, address: Address) -> bool {
        self.enabled && (self.target_address.is_zero() || self.target_address == address)
    }
}
