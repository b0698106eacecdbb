//! Domain layer: strong types with validation and invariants (no I/O).

mod request;
mod response;
mod validation;
mod value;

pub use request::{PreparedRecipients, SendCommand, UpdateCommand};
pub use response::{BalanceProbe, SendOutcome, SessionState};
pub use validation::ValidationError;
pub use value::{Cost, FreeMode, LoginId, MessageText, Money, Password, SendType};
