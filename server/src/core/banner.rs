//! Startup banner and URL display

use std::path::Path;

use super::config::is_all_interfaces;
use super::constants::{API_VERSION, APP_NAME};

/// Label column width
const W: usize = 10;

/// Wrap a URL in an OSC 8 hyperlink when the terminal supports it
fn terminal_link(url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        format!("\x1b]8;;{}\x07\x1b[36m{}\x1b[0m\x1b]8;;\x07", url, url)
    } else {
        format!("\x1b[36m{}\x1b[0m", url)
    }
}

fn print_url(label: &str, url: &str) {
    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
        label,
        terminal_link(url)
    );
}

/// Print the startup banner with URLs
pub fn print_banner(host: &str, port: u16, data_dir: &Path, duckdb_path: &Path, record_types: usize) {
    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };
    let base = format!("http://{}:{}", display_host, port);

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME, API_VERSION
    );
    println!();

    print_url("Query:", &format!("{}/api/v1/query", base));
    print_url("OpenAPI:", &format!("{}/api/openapi.json", base));

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    } else if is_all_interfaces(host) {
        if let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            for (_, ip) in interfaces
                .iter()
                .filter(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
            {
                print_url("Network:", &format!("http://{}:{}", ip, port));
            }
        }
    } else {
        print_url("Network:", &base);
    }

    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir.display());
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "DuckDB:", duckdb_path.display());
    println!(
        "  \x1b[90m➜  {:<W$} {} record types\x1b[0m",
        "Catalog:", record_types
    );
    println!();
}
