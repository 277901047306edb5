//! Display formatting for CLI output
//!
//! Pure functions that format data for display; no I/O here.

use crate::admin::{Consumer, JwtCredential, Route};
use crate::cloud::Domain;

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple column-aligned table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No resources found.\n".to_string();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    // Header
    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            output.push_str("   ");
        }
        output.push_str(&format!("{:width$}", header, width = widths[i]));
    }
    output.push('\n');

    // Rows
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str("   ");
            }
            if i < widths.len() {
                output.push_str(&format!("{:width$}", cell, width = widths[i]));
            } else {
                output.push_str(cell);
            }
        }
        output.push('\n');
    }

    output
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

// ============================================================================
// Route display
// ============================================================================

/// Format the route list for display
pub fn format_routes(routes: &[Route]) -> String {
    let headers = &["RELATIVE URL", "TARGET", "HTTP METHODS", "CORS", "JWT"];
    let rows: Vec<Vec<String>> = routes
        .iter()
        .map(|r| {
            let methods = if r.http_methods.is_empty() {
                "All".to_string()
            } else {
                r.http_methods.join(", ")
            };
            vec![
                r.relative_url.clone(),
                r.target.clone(),
                methods,
                yes_no(r.cors),
                yes_no(r.jwt),
            ]
        })
        .collect();

    format_table(headers, rows)
}

// ============================================================================
// Consumer and credential display
// ============================================================================

pub fn format_consumers(consumers: &[Consumer]) -> String {
    let headers = &["USERNAME"];
    let rows: Vec<Vec<String>> =
        consumers.iter().map(|c| vec![c.username.clone()]).collect();

    format_table(headers, rows)
}

pub fn format_jwt_credentials(credentials: &[JwtCredential]) -> String {
    let headers = &["ALGORITHM", "SECRET", "ISS"];
    let rows: Vec<Vec<String>> = credentials
        .iter()
        .map(|c| vec![c.algorithm.clone(), c.secret.clone(), c.iss.clone()])
        .collect();

    format_table(headers, rows)
}

// ============================================================================
// Domain and infra display
// ============================================================================

pub fn format_domains(domains: &[Domain]) -> String {
    let headers = &["HOSTNAME", "STATUS"];
    let rows: Vec<Vec<String>> = domains
        .iter()
        .map(|d| vec![d.hostname.clone(), format!("{:?}", d.status).to_lowercase()])
        .collect();

    format_table(headers, rows)
}

/// Format the component status list from `infra check`
pub fn format_check(components: &[(&'static str, String)]) -> String {
    let headers = &["COMPONENT", "STATUS"];
    let rows: Vec<Vec<String>> = components
        .iter()
        .map(|(name, status)| vec![name.to_string(), status.clone()])
        .collect();

    format_table(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::containers::DomainStatus;

    #[test]
    fn test_format_table_aligns_columns() {
        let headers = &["NAME", "AGE"];
        let rows = vec![
            vec!["Alice".to_string(), "30".to_string()],
            vec!["Bob".to_string(), "25".to_string()],
        ];

        let output = format_table(headers, rows);
        assert!(output.contains("NAME "));
        assert!(output.contains("Alice"));
        assert!(output.contains("Bob  "));
    }

    #[test]
    fn test_format_table_empty() {
        let output = format_table(&["NAME"], vec![]);
        assert!(output.contains("No resources found"));
    }

    #[test]
    fn test_format_routes_empty_methods_rendered_all() {
        let mut restricted = Route::new("/orders", "https://orders.internal");
        restricted.http_methods = vec!["GET".to_string(), "POST".to_string()];
        restricted.jwt = true;
        let open = Route::new("/status", "http://status.internal");

        let output = format_routes(&[restricted, open]);
        assert!(output.contains("GET, POST"));
        assert!(output.contains("All"));
        assert!(output.contains("/orders"));
        assert!(output.contains("https://orders.internal"));
    }

    #[test]
    fn test_format_consumers() {
        let consumers = vec![Consumer::new("alice"), Consumer::new("bob")];
        let output = format_consumers(&consumers);
        assert!(output.contains("USERNAME"));
        assert!(output.contains("alice"));
        assert!(output.contains("bob"));
    }

    #[test]
    fn test_format_jwt_credentials() {
        let creds = vec![JwtCredential {
            algorithm: "HS256".to_string(),
            secret: "s3cret".to_string(),
            iss: "issuer-1".to_string(),
        }];
        let output = format_jwt_credentials(&creds);
        assert!(output.contains("HS256"));
        assert!(output.contains("issuer-1"));
    }

    #[test]
    fn test_format_domains_lowercases_status() {
        let domains = vec![Domain {
            id: "d-1".to_string(),
            hostname: "api.example.com".to_string(),
            status: DomainStatus::Ready,
            error_message: None,
        }];
        let output = format_domains(&domains);
        assert!(output.contains("api.example.com"));
        assert!(output.contains("ready"));
    }
}
