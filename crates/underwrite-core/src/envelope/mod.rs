//! Response envelope parsing and projection.
//!
//! Model output is parsed into a permissive JSON tree first, then projected
//! into typed per-agent reports whose fields are all optional. A field that is
//! missing or cannot be coerced is simply absent; it never fails the parse.

mod coerce;
mod model;
mod parser;

pub use coerce::{kind_name, to_f64, to_text, to_text_list};
pub use model::{
    AgentOutput, CreditAnalystReport, Decision, Envelope, LoanOfficerReport, RiskManagerReport,
    CREDIT_ANALYST, LOAN_OFFICER, REQUIRED_AGENTS, RISK_MANAGER,
};
pub use parser::{strip_code_fence, MalformedResponse, ResponseParser};
