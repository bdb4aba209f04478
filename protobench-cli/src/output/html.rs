//! Static HTML report generation

use anyhow::Result;
use chrono::Utc;
use protobench_core::{BenchmarkRun, SummaryStats};
use std::path::Path;

use super::write_atomic;

/// Write a static HTML report with one stat-card section per run
pub fn to_html_report(runs: &[BenchmarkRun], path: &Path, title: &str) -> Result<()> {
    write_atomic(path, render_html_report(runs, title).as_bytes())
}

/// Render the report document
pub fn render_html_report(runs: &[BenchmarkRun], title: &str) -> String {
    let title = escape(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
        }}
        .container {{
            max-width: 1200px;
            margin: 0 auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}
        h1 {{
            color: #333;
            border-bottom: 3px solid #4caf50;
            padding-bottom: 10px;
        }}
        .metadata {{
            background: #f8f9fa;
            padding: 15px;
            border-radius: 4px;
            margin: 20px 0;
        }}
        .metadata p {{
            margin: 5px 0;
        }}
        .protocol-section {{
            margin: 30px 0;
            padding: 20px;
            border-left: 4px solid #4caf50;
            background: #fafafa;
        }}
        .protocol-section h2 {{
            margin-top: 0;
            color: #4caf50;
        }}
        .muted {{
            color: #666;
            font-size: 0.9em;
        }}
        .stats-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 15px;
            margin: 20px 0;
        }}
        .stat-card {{
            background: white;
            padding: 15px;
            border-radius: 4px;
            border: 1px solid #e0e0e0;
        }}
        .stat-label {{
            font-size: 14px;
            color: #666;
            margin-bottom: 5px;
        }}
        .stat-value {{
            font-size: 22px;
            font-weight: bold;
            color: #333;
        }}
        table {{
            width: 100%;
            border-collapse: collapse;
            margin: 20px 0;
        }}
        th, td {{
            padding: 12px;
            text-align: left;
            border-bottom: 1px solid #ddd;
        }}
        th {{
            background: #4caf50;
            color: white;
            font-weight: 600;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>

        <div class="metadata">
            <p class="muted">Generated: {generated}</p>
            <p><strong>Protocols:</strong> {count}</p>
        </div>
{overview}
{sections}
    </div>
</body>
</html>
"#,
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        count = runs.len(),
        overview = overview_table(runs),
        sections = runs.iter().map(run_section).collect::<Vec<_>>().join("\n"),
    )
}

fn overview_table(runs: &[BenchmarkRun]) -> String {
    if runs.is_empty() {
        return String::new();
    }

    let rows = runs
        .iter()
        .map(|run| {
            let cell = |f: fn(&SummaryStats) -> Option<f64>| {
                run.stats
                    .as_ref()
                    .filter(|s| !s.is_empty())
                    .and_then(f)
                    .map(fmt_seconds)
                    .unwrap_or_else(|| "-".to_string())
            };
            format!(
                r#"            <tr>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
            </tr>"#,
                escape(&run.protocol),
                run.metrics.len(),
                cell(|s| Some(s.mean)),
                cell(|s| Some(s.median)),
                cell(|s| s.p95),
                cell(|s| s.p99),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
        <h2>Overview</h2>
        <table>
            <tr>
                <th>Protocol</th>
                <th>Samples</th>
                <th>Mean</th>
                <th>Median</th>
                <th>p95</th>
                <th>p99</th>
            </tr>
{rows}
        </table>"#
    )
}

fn run_section(run: &BenchmarkRun) -> String {
    let stats = match &run.stats {
        Some(stats) if !stats.is_empty() => stat_grid(stats),
        _ => r#"            <p class="muted">No latency samples recorded.</p>"#.to_string(),
    };

    format!(
        r#"
        <div class="protocol-section">
            <h2>{}</h2>
            <p class="muted">Run ID: {}</p>
            <p class="muted">Timestamp: {}</p>
{}
        </div>"#,
        escape(&run.protocol),
        escape(&run.run_id),
        run.timestamp.format("%Y-%m-%d %H:%M:%S"),
        stats
    )
}

fn stat_grid(stats: &SummaryStats) -> String {
    let mut cards = vec![
        ("Mean", fmt_seconds(stats.mean)),
        ("Median", fmt_seconds(stats.median)),
        ("Std Dev", fmt_seconds(stats.std_dev)),
        ("Min", fmt_seconds(stats.min)),
        ("Max", fmt_seconds(stats.max)),
        ("Count", stats.count.to_string()),
    ];
    if let Some(p95) = stats.p95 {
        cards.push(("P95", fmt_seconds(p95)));
    }
    if let Some(p99) = stats.p99 {
        cards.push(("P99", fmt_seconds(p99)));
    }

    let cards = cards
        .into_iter()
        .map(|(label, value)| {
            format!(
                r#"                <div class="stat-card">
                    <div class="stat-label">{label}</div>
                    <div class="stat-value">{value}</div>
                </div>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("            <div class=\"stats-grid\">\n{cards}\n            </div>")
}

fn fmt_seconds(seconds: f64) -> String {
    format!("{seconds:.6}s")
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
