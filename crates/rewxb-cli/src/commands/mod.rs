//! CLI command implementations

pub mod inspect;
pub mod rewrite;

mod reporting;

use rewxb_bank::BankError;

/// Process exit status for a failed run.
///
/// Bank errors keep their category code, truncated to a byte the way the
/// platform reports negative statuses. Anything else is a usage error.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<BankError>() {
        Some(bank_err) => bank_err.exit_code() as u8,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn bank_errors_keep_their_category() {
        let err = anyhow::Error::from(BankError::UnsupportedSeekTables);
        assert_eq!(exit_status(&err), 253);

        let err = anyhow::Error::from(BankError::EmptyOutput { index: 3 });
        assert_eq!(exit_status(&err), 251);
    }

    #[test]
    fn context_does_not_hide_the_category() {
        let result: Result<(), BankError> = Err(BankError::Write(std::io::Error::other("disk")));
        let err = result.context("failed to write out.xwb").unwrap_err();
        assert_eq!(exit_status(&err), 254);
    }

    #[test]
    fn other_errors_are_usage_errors() {
        assert_eq!(exit_status(&anyhow::anyhow!("bad arguments")), 1);
    }
}
