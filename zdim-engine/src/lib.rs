pub mod dimension;
pub mod style;
pub mod units;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ComposeError {
        #[error("unknown drawing unit code {0}")]
        UnknownUnit(i32),
    }
}
