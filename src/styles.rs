//! Collecting the style text that applies to the rendered page.

use serde::Deserialize;
use sitesnap_browser::BrowserSession;
use tracing::instrument;

/// Returns `{inline, rules, blocked}`. Stylesheets owned by a `<style>`
/// element are skipped: their text is already in `inline`. Reading `cssRules`
/// of a cross-origin sheet throws; those sheets are counted in `blocked`.
const COLLECT_STYLES: &str = r#"(() => {
    const inline = Array.from(document.querySelectorAll('style'), (style) => style.textContent || '');
    const rules = [];
    let blocked = 0;
    for (const sheet of Array.from(document.styleSheets)) {
        const owner = sheet.ownerNode;
        if (owner && owner.nodeName.toUpperCase() === 'STYLE') {
            continue;
        }
        let cssRules = null;
        try {
            cssRules = sheet.cssRules;
        } catch (e) {
            cssRules = null;
        }
        if (!cssRules) {
            blocked += 1;
            continue;
        }
        for (const rule of Array.from(cssRules)) {
            rules.push(rule.cssText);
        }
    }
    return { inline, rules, blocked };
})()"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CollectedStyles {
    inline: Vec<String>,
    rules: Vec<String>,
    blocked: usize,
}

/// All style text of the loaded page: inline `<style>` blocks first, then the
/// rules of every readable stylesheet, one entry per line.
///
/// Never fails. Unreadable stylesheets are skipped, and if collection as a
/// whole fails the result is empty.
#[instrument(skip_all)]
pub async fn extract_styles(session: &dyn BrowserSession) -> String {
    let value = match session.evaluate(COLLECT_STYLES).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %*e, "Style collection failed; continuing without styles");
            return String::new();
        },
    };
    let collected: CollectedStyles = match serde_json::from_value(value) {
        Ok(collected) => collected,
        Err(e) => {
            tracing::warn!(error = %e, "Style collection returned an unexpected shape; continuing without styles");
            return String::new();
        },
    };
    if collected.blocked > 0 {
        tracing::warn!(blocked = collected.blocked, "Skipped stylesheets that could not be read");
    }
    let css = collected
        .inline
        .iter()
        .chain(&collected.rules)
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    tracing::debug!(inline = collected.inline.len(), rules = collected.rules.len(), bytes = css.len(), "Styles collected");
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSession;
    use serde_json::json;

    #[tokio::test]
    async fn inline_blocks_come_before_sheet_rules() {
        let session = ScriptedSession::default().answer(
            "styleSheets",
            json!({
                "inline": ["body { margin: 0; }"],
                "rules": ["h1 { color: red; }", "p { color: blue; }"],
                "blocked": 0,
            }),
        );
        let css = extract_styles(&session).await;
        assert_eq!(css, "body { margin: 0; }\nh1 { color: red; }\np { color: blue; }");
    }

    #[tokio::test]
    async fn blocked_sheets_leave_the_readable_ones() {
        let session = ScriptedSession::default().answer(
            "styleSheets",
            json!({ "inline": [".local { display: none; }"], "rules": [], "blocked": 1 }),
        );
        assert_eq!(extract_styles(&session).await, ".local { display: none; }");
    }

    #[tokio::test]
    async fn blank_entries_are_dropped() {
        let session = ScriptedSession::default()
            .answer("styleSheets", json!({ "inline": ["", "  \n "], "rules": ["a {}", "   "], "blocked": 0 }));
        assert_eq!(extract_styles(&session).await, "a {}");
    }

    #[tokio::test]
    async fn evaluation_failure_degrades_to_empty() {
        assert_eq!(extract_styles(&ScriptedSession::default()).await, "");
    }

    #[tokio::test]
    async fn malformed_result_degrades_to_empty() {
        let session = ScriptedSession::default().answer("styleSheets", json!({ "inline": "not a list" }));
        assert_eq!(extract_styles(&session).await, "");
    }

    #[tokio::test]
    async fn null_result_degrades_to_empty() {
        let session = ScriptedSession::default().answer("styleSheets", serde_json::Value::Null);
        assert_eq!(extract_styles(&session).await, "");
    }
}
