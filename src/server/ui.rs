//! Server-rendered form page

use std::fmt::Write;

use crate::inference::ProfitEstimate;
use crate::schema::{BlockRecord, RockType, FIELD_SPECS};

use super::state::ModelState;

/// Result area of the page
#[derive(Debug, Clone)]
pub enum Outcome {
    Estimate(ProfitEstimate),
    Rejected(String),
}

const PAGE_STYLE: &str = r#"
body{margin:0;font-family:system-ui,-apple-system,sans-serif;background:#f3f7f2;color:#1f2d1f}
header{background:#2e7d32;color:#fff;padding:18px 28px}
header h1{margin:0;font-size:1.5rem}
header p{margin:4px 0 0;opacity:.85}
main{display:flex;gap:24px;padding:24px 28px;flex-wrap:wrap}
aside{flex:0 0 260px;background:#fff;border:1px solid #c8e6c9;border-radius:8px;padding:16px;font-size:.9rem}
aside h2{margin-top:0;font-size:1rem;color:#2e7d32}
aside dt{font-weight:600;margin-top:8px}
aside dd{margin:0}
section{flex:1 1 480px}
form{background:#fff;border:1px solid #c8e6c9;border-radius:8px;padding:20px;display:grid;grid-template-columns:repeat(auto-fill,minmax(200px,1fr));gap:14px}
label{display:flex;flex-direction:column;font-size:.85rem;font-weight:600;gap:4px}
input,select{padding:6px 8px;border:1px solid #a5d6a7;border-radius:4px;font-size:.95rem}
button{grid-column:1/-1;padding:10px;background:#388e3c;color:#fff;border:0;border-radius:6px;font-size:1rem;cursor:pointer}
button:disabled{background:#9e9e9e;cursor:not-allowed}
.banner{background:#ffebee;border:1px solid #ef9a9a;color:#b71c1c;border-radius:8px;padding:12px 16px;margin-bottom:16px}
.banner code{background:#fff;padding:2px 6px;border-radius:4px}
.result{margin-top:20px;border-radius:8px;padding:18px;background:#e8f5e9;border:2px solid #43a047}
.result .value{font-size:1.8rem;font-weight:700;color:#1b5e20}
.result.loss{background:#fff8e1;border-color:#f9a825}
.result.loss .value{color:#e65100}
.result.error{background:#ffebee;border-color:#e53935;color:#b71c1c}
"#;

/// Whole page for the current model state, echoing `record` back into the form
pub fn render_page(model: &ModelState, record: &BlockRecord, outcome: Option<&Outcome>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Mining Block Profit Predictor</title>\n<style>");
    html.push_str(PAGE_STYLE);
    html.push_str("</style>\n</head>\n<body>\n<header>\n<h1>Mining Block Profit Predictor</h1>\n");
    html.push_str("<p>Estimate the profit of a single block from its geology and costs.</p>\n</header>\n<main>\n");

    render_sidebar(&mut html, model);

    html.push_str("<section>\n");
    if let ModelState::NoArtifact { path, reason } = model {
        let _ = write!(
            html,
            "<div class=\"banner\"><strong>No trained model available.</strong> {}<br>Train the model first with \
             <code>block-profit train --output {}</code> and restart the server.</div>\n",
            escape(reason),
            escape(&path.display().to_string())
        );
    }

    let rock_types = match model.predictor() {
        Some(predictor) => predictor.rock_types(),
        None => RockType::ALL.to_vec(),
    };
    render_form(&mut html, record, &rock_types, model.is_loaded());

    if let Some(outcome) = outcome {
        render_outcome(&mut html, outcome);
    }

    html.push_str("</section>\n</main>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, model: &ModelState) {
    html.push_str("<aside>\n<h2>Model</h2>\n<dl>\n");
    match model {
        ModelState::Loaded(predictor) => {
            let artifact = predictor.artifact();
            let config = artifact.model.config();
            let _ = write!(
                html,
                "<dt>Regressor</dt><dd>Gradient boosted trees ({} trees, depth {}, lr {})</dd>\n\
                 <dt>Features</dt><dd>{} numeric, {} categorical</dd>\n\
                 <dt>Trained</dt><dd>{}</dd>\n\
                 <dt>Rows</dt><dd>{} train / {} holdout</dd>\n",
                artifact.model.n_trees(),
                config.max_depth,
                config.learning_rate,
                artifact.num_cols.len(),
                artifact.cat_cols.len(),
                escape(&artifact.metadata.created_at),
                artifact.metadata.n_train,
                artifact.metadata.n_holdout,
            );
            if let Some(m) = &artifact.metadata.holdout_metrics {
                let _ = write!(
                    html,
                    "<dt>Holdout</dt><dd>R² {:.4}<br>MAE {:.2}<br>RMSE {:.2}</dd>\n",
                    m.r2, m.mae, m.rmse
                );
            }
            let top: Vec<String> = predictor
                .feature_importances()
                .into_iter()
                .take(5)
                .map(|(name, share)| format!("{} {:.1}%", escape(&name), share * 100.0))
                .collect();
            if !top.is_empty() {
                let _ = write!(html, "<dt>Top features</dt><dd>{}</dd>\n", top.join("<br>"));
            }
        }
        ModelState::NoArtifact { .. } => {
            html.push_str("<dt>Status</dt><dd>Not loaded</dd>\n");
        }
    }
    html.push_str("</dl>\n</aside>\n");
}

fn render_form(html: &mut String, record: &BlockRecord, rock_types: &[RockType], enabled: bool) {
    html.push_str("<form method=\"post\" action=\"/predict\">\n");

    for field in FIELD_SPECS.iter() {
        let value = record.numeric_value(field.column).unwrap_or(field.default);
        let _ = write!(
            html,
            "<label>{}<input type=\"number\" name=\"{}\" min=\"{}\" max=\"{}\" step=\"{}\" value=\"{}\" required></label>\n",
            escape(field.label),
            field.key,
            field.min,
            field.max,
            field.step,
            value
        );
    }

    html.push_str("<label>Waste_Flag<select name=\"waste_flag\">");
    for (flag, text) in [(0u8, "0 - ore"), (1u8, "1 - waste")] {
        let selected = if record.waste_flag == flag { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{flag}\"{selected}>{text}</option>");
    }
    html.push_str("</select></label>\n");

    html.push_str("<label>Rock_Type<select name=\"rock_type\">");
    for &rock in rock_types {
        let selected = if record.rock_type == rock { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{rock}\"{selected}>{rock}</option>");
    }
    html.push_str("</select></label>\n");

    let disabled = if enabled { "" } else { " disabled" };
    let _ = write!(html, "<button type=\"submit\"{disabled}>Predict Profit</button>\n</form>\n");
}

fn render_outcome(html: &mut String, outcome: &Outcome) {
    match outcome {
        Outcome::Estimate(estimate) => {
            let class = if estimate.verdict.is_viable() { "result" } else { "result loss" };
            let _ = write!(
                html,
                "<div class=\"{}\"><div>Predicted Profit</div><div class=\"value\">{}</div><p>{}</p></div>\n",
                class,
                estimate.formatted(),
                estimate.verdict.message()
            );
        }
        Outcome::Rejected(message) => {
            let _ = write!(html, "<div class=\"result error\">{}</div>\n", escape(message));
        }
    }
}

/// Minimal HTML escaping for text and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn no_artifact() -> ModelState {
        ModelState::NoArtifact {
            path: PathBuf::from("xgboost_pipeline.json"),
            reason: "Model artifact not found at xgboost_pipeline.json".to_string(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_missing_model_disables_submit() {
        let page = render_page(&no_artifact(), &BlockRecord::default(), None);
        assert!(page.contains("class=\"banner\""));
        assert!(page.contains("block-profit train"));
        assert!(page.contains("<button type=\"submit\" disabled>"));
    }

    #[test]
    fn test_form_echoes_record() {
        let record = BlockRecord { tonnage: 3100.0, rock_type: RockType::Waste, waste_flag: 1, ..Default::default() };
        let page = render_page(&no_artifact(), &record, None);
        assert!(page.contains("name=\"tonnage\" min=\"500\" max=\"5000\" step=\"100\" value=\"3100\""));
        assert!(page.contains("<option value=\"Waste\" selected>"));
        assert!(page.contains("<option value=\"1\" selected>"));
    }

    #[test]
    fn test_form_offers_only_given_rock_types() {
        let mut html = String::new();
        render_form(&mut html, &BlockRecord::default(), &[RockType::Hematite, RockType::Waste], true);
        assert!(html.contains("<option value=\"Waste\""));
        assert!(!html.contains("<option value=\"Magnetite\""));
    }

    #[test]
    fn test_outcome_rendering() {
        let page = render_page(
            &no_artifact(),
            &BlockRecord::default(),
            Some(&Outcome::Estimate(ProfitEstimate::new(-1234.5))),
        );
        assert!(page.contains("-1,234.50 USD"));
        assert!(page.contains("not recommended"));

        let page = render_page(
            &no_artifact(),
            &BlockRecord::default(),
            Some(&Outcome::Rejected("Tonnage <bad>".to_string())),
        );
        assert!(page.contains("Tonnage &lt;bad&gt;"));
    }
}
