pub mod allocator;
pub mod residue_assignment;
pub mod settlement_calculator;

pub use allocator::{AllocationError, AllocationRequest, Allocator, SplitMode, TaxRate};
pub use residue_assignment::{ResidueAssignment, UnknownResidueAssignment};
pub use settlement_calculator::{
    GreedySettlement, SettlementCalculator, SettlementError, SettlementStrategy,
};
