//! Error codes and exit status for qrpayctl

use qrpay_common::ScanError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the input was rejected before any request was made
pub const EXIT_INVALID_INPUT: i32 = 64;

/// Exit code when the same action is already in flight
pub const EXIT_BUSY: i32 = 65;

/// Exit code when the scanning service is unavailable or answered non-2xx
pub const EXIT_SERVICE_UNAVAILABLE: i32 = 70;

/// Map an error to the process exit status
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ScanError>() {
        Some(ScanError::InvalidInput(_)) | Some(ScanError::Io { .. }) => EXIT_INVALID_INPUT,
        Some(ScanError::Busy(_)) => EXIT_BUSY,
        Some(scan) if scan.is_network_failure() => EXIT_SERVICE_UNAVAILABLE,
        _ => EXIT_GENERAL_ERROR,
    }
}

/// Short machine-readable code for the invocation log
pub fn error_code_for(error: &anyhow::Error) -> &'static str {
    match error.downcast_ref::<ScanError>() {
        Some(ScanError::InvalidInput(_)) => "invalid_input",
        Some(ScanError::Io { .. }) => "io",
        Some(ScanError::Busy(_)) => "busy",
        Some(ScanError::Network(_)) => "network",
        Some(ScanError::Timeout(_)) => "timeout",
        Some(ScanError::Status { .. }) => "http_status",
        None => "general",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let cases = [
            (ScanError::InvalidInput("Please enter QR text.".into()), EXIT_INVALID_INPUT),
            (ScanError::Busy("scan"), EXIT_BUSY),
            (ScanError::Network("refused".into()), EXIT_SERVICE_UNAVAILABLE),
            (ScanError::Timeout(30), EXIT_SERVICE_UNAVAILABLE),
            (
                ScanError::Status {
                    status: 500,
                    message: "HTTP 500".into(),
                },
                EXIT_SERVICE_UNAVAILABLE,
            ),
        ];
        for (scan, code) in cases {
            assert_eq!(exit_code_for(&anyhow::Error::new(scan)), code);
        }
    }

    #[test]
    fn test_non_scan_error_is_general() {
        let error = anyhow::anyhow!("Failed to parse /etc/qrpay/config.toml");
        assert_eq!(exit_code_for(&error), EXIT_GENERAL_ERROR);
        assert_eq!(error_code_for(&error), "general");
    }

    #[test]
    fn test_context_keeps_scan_error() {
        let error = anyhow::Error::new(ScanError::Busy("scan")).context("scan-text");
        assert_eq!(exit_code_for(&error), EXIT_BUSY);
        assert_eq!(error_code_for(&error), "busy");
    }
}
