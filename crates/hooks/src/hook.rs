use std::collections::{BTreeSet, HashMap};

use revm::interpreter::opcode;
use revm::interpreter::{CallInputs, CallOutcome, Interpreter};
use revm::{Database, EvmContext, Inspector};
use tinyevm_primitives::Address;

use crate::config::InstrumentConfig;
use crate::finding::{BugType, Finding};

/// Aggregate counters collected over a call, independent of the detailed findings list — a
/// fuzzer can check these cheaply without walking `findings`.
#[derive(Debug, Clone, Default)]
pub struct Heuristics {
    pub instructions_executed: u64,
    pub calls_made: u64,
    pub max_call_depth: u32,
}

/// `revm::Inspector` implementation that records per-address program-counter coverage and raises
/// `Finding`s while a call executes. One instance is created per call and discarded afterwards;
/// `into_parts` hands the accumulated coverage and findings back to the caller.
pub struct InstrumentationHook {
    config: InstrumentConfig,
    seen_pcs: HashMap<Address, BTreeSet<u64>>,
    findings: Vec<Finding>,
    heuristics: Heuristics,
    call_stack: Vec<Address>,
}

impl InstrumentationHook {
    pub fn new(config: InstrumentConfig) -> Self {
        Self {
            config,
            seen_pcs: HashMap::new(),
            findings: Vec::new(),
            heuristics: Heuristics::default(),
            call_stack: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (HashMap<Address, BTreeSet<u64>>, Vec<Finding>, Heuristics) {
        (self.seen_pcs, self.findings, self.heuristics)
    }

    /// Registers the outermost call's target before execution starts. `Inspector::call` only
    /// fires for nested `CALL`-family opcodes, never for the top-level entry, so without this the
    /// first batch of `step` events would be attributed to the zero address.
    pub fn enter_top_level(&mut self, address: Address) {
        self.call_stack.push(address);
    }

    fn push_finding(&mut self, bug_type: BugType, address: Address, pc: u64, message: impl Into<String>) {
        self.findings.push(Finding::new(bug_type, address, pc, message));
    }
}

impl<DB: Database> Inspector<DB> for InstrumentationHook {
    fn step(&mut self, interp: &mut Interpreter, _context: &mut EvmContext<DB>) {
        let address = self.call_stack.last().copied().unwrap_or_default();
        let pc = interp.program_counter() as u64;
        let opcode = interp.current_opcode();

        self.heuristics.instructions_executed += 1;

        if !self.config.records(address) {
            return;
        }

        self.seen_pcs.entry(address).or_default().insert(pc);

        if self.config.detect_integer_overflow
            && matches!(opcode, opcode::ADD | opcode::MUL | opcode::SUB)
        {
            if let (Some(a), Some(b)) = (interp.stack.peek(0).ok(), interp.stack.peek(1).ok()) {
                let overflowed = match opcode {
                    opcode::ADD => a.overflowing_add(b).1,
                    opcode::MUL => a.overflowing_mul(b).1,
                    opcode::SUB => b > a,
                    _ => false,
                };
                if overflowed {
                    self.push_finding(
                        BugType::IntegerOverflow,
                        address,
                        pc,
                        format!("arithmetic opcode 0x{opcode:02x} wrapped"),
                    );
                }
            }
        }

        if self.config.detect_selfdestruct && opcode == opcode::SELFDESTRUCT {
            self.push_finding(BugType::SelfDestructReachable, address, pc, "SELFDESTRUCT reached");
        }
    }

    fn call(&mut self, _context: &mut EvmContext<DB>, inputs: &mut CallInputs) -> Option<CallOutcome> {
        self.heuristics.calls_made += 1;
        self.heuristics.max_call_depth = self.heuristics.max_call_depth.max(self.call_stack.len() as u32 + 1);

        let target = inputs.target_address;
        if !self.config.records(target) {
            self.call_stack.push(target);
            return None;
        }

        if self.config.detect_reentrancy && self.call_stack.contains(&target) {
            self.push_finding(
                BugType::ReentrantCall,
                target,
                0,
                format!("address {target} re-entered while already on the call stack"),
            );
        }

        if self.config.detect_suspicious_calls
            && !inputs.value.get().is_zero()
            && self.call_stack.len() > 2
        {
            self.push_finding(
                BugType::SuspiciousExternalCall,
                target,
                0,
                "value-bearing external call beyond depth 2",
            );
        }

        self.call_stack.push(target);
        None
    }

    fn call_end(
        &mut self,
        _context: &mut EvmContext<DB>,
        _inputs: &CallInputs,
        outcome: CallOutcome,
    ) -> CallOutcome {
        self.call_stack.pop();
        outcome
    }
}
