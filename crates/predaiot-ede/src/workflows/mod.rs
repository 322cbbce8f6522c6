pub mod decision;
pub mod delivery;
pub mod impact;
pub mod pipeline;
pub mod portfolio;
pub mod yield_report;
