pub mod engine;
pub mod error;
pub mod eval;
pub mod http;
pub mod poc;

pub use crate::engine::{PocEngine, RunOutcome};
pub use crate::error::{EvalError, PocError, ScanError};
pub use crate::eval::{RuleOutcome, RuleResults};
pub use crate::http::{HttpClient, HttpRequest, ResponseView};
pub use crate::poc::search::{list_pocs, search_pocs, PocFileInfo};
pub use crate::poc::Poc;
