//! Request handling for `{name, parameters}` API calls.
//!
//! Validation failures are returned as data in the standard envelope:
//!
//! ```json
//! {"success": false, "error": {"code": 400, "message": "...", "details": ["..."]}}
//! ```

use serde_json::{Value, json};

use crate::config::ConfigurationManager;

pub const BAD_REQUEST: u16 = 400;

/// Validate an API request against the endpoint's rules and return the
/// response envelope.
///
/// Parameters are normalised with [`ConfigurationManager::resolve_parameters`]
/// before validation; a missing `parameters` field is validated as absent,
/// so broad-search endpoints report it precisely. Template defaults never
/// count toward the broad-search guard.
pub fn process_api_request(manager: &ConfigurationManager, request: &Value) -> Value {
    let Some(endpoint) = request.get("name").and_then(Value::as_str) else {
        return error_response(BAD_REQUEST, "Request is missing 'name'.", &[]);
    };

    let (supplied, parameters) = match request.get("parameters") {
        Some(params) => (
            manager.alias_parameters(endpoint, params),
            manager.resolve_parameters(endpoint, params),
        ),
        None => (Value::Null, Value::Null),
    };

    let errors = manager.request_errors(endpoint, &supplied, &parameters);
    if let Some(first) = errors.first() {
        tracing::debug!(endpoint, errors = errors.len(), "request rejected");
        return error_response(BAD_REQUEST, first, &errors);
    }

    json!({
        "success": true,
        "message": format!("Request processed successfully for endpoint: {endpoint}"),
        "resolved_parameters": parameters,
    })
}

pub fn error_response(code: u16, message: &str, details: &[String]) -> Value {
    json!({
        "success": false,
        "error": {
            "code": code,
            "message": message,
            "details": details,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameters_object() {
        let manager = ConfigurationManager::new();
        let response =
            process_api_request(&manager, &json!({"name": "getDrugGeneInteractions"}));
        assert_eq!(response["success"], false);
        assert_eq!(response["error"]["code"], 400);
        let msg = response["error"]["message"].as_str().unwrap();
        assert!(msg.contains("Missing parameters object"), "got: {msg}");
    }

    #[test]
    fn test_empty_parameters_object() {
        let manager = ConfigurationManager::new();
        let response = process_api_request(
            &manager,
            &json!({"name": "getResearchAssociations", "parameters": {}}),
        );
        assert_eq!(
            response["error"],
            json!({
                "code": 400,
                "message": "At least one search parameter is required for this endpoint.",
                "details": ["At least one search parameter is required for this endpoint."]
            })
        );
    }

    #[test]
    fn test_empty_array_rejected() {
        let manager = ConfigurationManager::new();
        let response = process_api_request(
            &manager,
            &json!({"name": "getResearchAssociations", "parameters": {"gene_ids": []}}),
        );
        assert_eq!(response["success"], false);
        assert_eq!(
            response["error"]["message"],
            "At least one non-empty search parameter is required for this endpoint."
        );
    }

    #[test]
    fn test_meaningful_parameters_accepted() {
        let manager = ConfigurationManager::new();
        let response = process_api_request(
            &manager,
            &json!({"name": "getResearchAssociations", "parameters": {"gene_ids": ["COMT"]}}),
        );
        assert_eq!(response["success"], true);
        assert_eq!(
            response["message"],
            "Request processed successfully for endpoint: getResearchAssociations"
        );
        assert_eq!(response["resolved_parameters"]["gene_ids"][0], "COMT");
    }

    #[test]
    fn test_non_broad_endpoint_accepts_empty() {
        let manager = ConfigurationManager::new();
        for request in [
            json!({"name": "getGeneInfo", "parameters": {}}),
            json!({"name": "getGeneInfo"}),
        ] {
            let response = process_api_request(&manager, &request);
            assert_eq!(response["success"], true, "request: {request}");
        }
    }

    #[test]
    fn test_template_defaults_do_not_satisfy_broad_search() {
        use geneflow_types::validation::ParameterTemplate;

        let mut manager = ConfigurationManager::new();
        let template: ParameterTemplate = serde_json::from_value(json!({
            "parameters": {"limit": 50},
            "aliases": {"genes": "gene_ids"}
        }))
        .unwrap();
        manager.set_parameter_template("getResearchAssociations", template);

        let empty = process_api_request(
            &manager,
            &json!({"name": "getResearchAssociations", "parameters": {}}),
        );
        assert_eq!(empty["success"], false);
        assert_eq!(
            empty["error"]["message"],
            "At least one search parameter is required for this endpoint."
        );

        let blank = process_api_request(
            &manager,
            &json!({"name": "getResearchAssociations", "parameters": {"genes": []}}),
        );
        assert_eq!(blank["success"], false);
        assert_eq!(
            blank["error"]["message"],
            "At least one non-empty search parameter is required for this endpoint."
        );

        let ok = process_api_request(
            &manager,
            &json!({"name": "getResearchAssociations", "parameters": {"genes": ["COMT"]}}),
        );
        assert_eq!(ok["success"], true);
        assert_eq!(ok["resolved_parameters"], json!({"gene_ids": ["COMT"], "limit": 50}));
    }

    #[test]
    fn test_missing_name() {
        let manager = ConfigurationManager::new();
        let response = process_api_request(&manager, &json!({"parameters": {}}));
        assert_eq!(response["error"]["message"], "Request is missing 'name'.");
    }
}
