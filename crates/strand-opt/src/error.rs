use strand_netlist::NetlistError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OptError>;

#[derive(Debug, Error)]
pub enum OptError {
    #[error("{pass} did not reach a fixed point after {iterations} iterations")]
    NoFixedPoint { pass: String, iterations: usize },

    #[error(transparent)]
    Netlist(#[from] NetlistError),
}
