#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub fn wip() -> Command {
    cargo_bin_cmd!("wip-invoice")
}

/// Fresh, empty scratch directory inside the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("wip_invoice_{}", name));
    fs::remove_dir_all(&path).ok();
    fs::create_dir_all(&path).expect("create scratch dir");
    path
}

/// Settings document pointing at `output_dir` and `credentials_path`
pub fn settings_toml(output_dir: &Path, credentials_path: &str) -> String {
    format!(
        r#"
[sheets]
spreadsheet = "https://docs.google.com/spreadsheets/d/1TestSheetId/edit"
worksheet = "Sheet1"
credentials_path = "{credentials}"

[client]
name = "Acme Corp"
address = "1 Main St"
city_state_zip = "Springfield, IL 62701"
customer_id = "NES01"

[company]
name = "W3 Evolutions"
address = "PO Box 1, Springfield"
zelle = "pay@example.com"

[invoice]
hourly_rate = 126.0
discount = 49.0
terms = "Net 15"
sales_rep = "BK"
logo_path = "no-such-logo.png"

[output]
output_dir = "{output}"
generate_html = true
generate_json = true
generate_pdf = false
"#,
        credentials = credentials_path,
        output = output_dir.to_string_lossy().replace('\\', "/"),
    )
}

/// Header plus the seven June WIP rows, one billed row and two rows that
/// must be skipped.
pub fn june_rows() -> Vec<Vec<String>> {
    let raw: Vec<Vec<&str>> = vec![
        vec!["Date", "Hours", "Category", "Task/Work", "Persons", "Invoice", "Paid"],
        vec!["5/30/25", "8", "Enhancement", "Previous cycle", "BK", "NES01-5540", "Billed"],
        vec!["6/4/25", "17", "Enhancement", "AAE-101 UAT bug tracker list review", "BK/DH", "NES01-5541", "WIP"],
        vec!["6/5/25", "15", "Enhancement", "AAE-101 UAT bug tracker list review", "BK/DH", "NES01-5541", "WIP"],
        vec!["6/6/25", "16", "Enhancement", "AAE-101 UAT bug tracker + ERV2 prod issues", "BK/DH", "NES01-5541", "WIP"],
        vec!["6/6/25", "abc", "Enhancement", "Typo in hours", "BK", "NES01-5541", "WIP"],
        vec!["6/7/25", "9", "Enhancement", "AAE-101 UAT bug tracker list review", "BK/DH", "NES01-5541", "WIP"],
        vec!["6/8/25", "10", "Enhancement", "AAE-101 UAT bug tracker list review", "BK/DH", "NES01-5541", "WIP"],
        vec!["6/8/25", "3", "Enhancement", "", "BK", "NES01-5541", "WIP"],
        vec!["6/9/25", "17", "Enhancement", "AAE-101 UAT bug tracker list review", "BK/DH", "NES01-5541", "WIP"],
        vec!["6/10/25", "18", "Enhancement", "AAE-101 UAT bug tracker list review", "BK/DH", "NES01-5541", "wip"],
    ];
    raw.into_iter()
        .map(|r| r.into_iter().map(String::from).collect())
        .collect()
}
