pub mod job;
pub mod order;
pub mod product;
pub mod settlement;
pub mod transaction;

pub use job::*;
pub use order::*;
pub use product::*;
pub use settlement::*;
pub use transaction::*;
