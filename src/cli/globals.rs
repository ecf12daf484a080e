/// Configuration shared across the gateway and the client-side feature.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub upstream_url: String,
    pub cookie_name: String,
    pub frontend_origin: String,
    pub federation_client_id: Option<String>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(upstream_url: String) -> Self {
        Self {
            upstream_url,
            cookie_name: "session".to_string(),
            frontend_origin: "http://localhost:5173".to_string(),
            federation_client_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new("http://identity.internal:5000".to_string());
        assert_eq!(args.upstream_url, "http://identity.internal:5000");
        assert_eq!(args.cookie_name, "session");
        assert_eq!(args.frontend_origin, "http://localhost:5173");
        assert!(args.federation_client_id.is_none());
    }
}
