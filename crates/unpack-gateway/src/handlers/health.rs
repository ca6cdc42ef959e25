//! Liveness probe.

/// Handler for GET /health
///
/// Returns "OK" as plain text while the process is serving requests.
pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }
}
