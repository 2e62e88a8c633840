use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use serde_json::Value;
use url::Url;

use crate::almanac::config::SiteConfig;
use crate::almanac::types::parse_iso_utc;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Register `readableDate`, `ymd`, `absoluteUrl` and `inlineCss`.
pub fn register_filters(registry: &mut Handlebars<'_>, config: &SiteConfig) {
    registry.register_helper("readableDate", Box::new(readable_date_helper));
    registry.register_helper("ymd", Box::new(ymd_helper));
    registry.register_helper(
        "absoluteUrl",
        Box::new(AbsoluteUrl {
            default_base: config.site.base_url.clone(),
        }),
    );
    registry.register_helper(
        "inlineCss",
        Box::new(InlineCss {
            root: config.repository_root(),
        }),
    );
}

/// Format a date as `yyyy-MM-dd` in UTC.
///
/// Accepts an ISO-8601 string (with or without a time part) or milliseconds
/// since the Unix epoch.
pub fn readable_date(value: &Value) -> Result<String> {
    to_datetime(value)
        .map(|at| at.format(DATE_FORMAT).to_string())
        .ok_or_else(|| anyhow!("not a date: {value}"))
}

/// Like [`readable_date`], but empty or missing input renders as nothing.
///
/// A non-empty value that is not a date is an error, which aborts the render
/// rather than printing a placeholder.
pub fn ymd(value: &Value) -> Result<String> {
    if is_falsy(value) {
        return Ok(String::new());
    }
    readable_date(value)
}

/// Resolve `path` against `base`. An empty `path` yields `base` untouched.
pub fn absolute_url(path: &str, base: &str) -> Result<String> {
    if path.is_empty() {
        return Ok(base.to_string());
    }
    if let Ok(absolute) = Url::parse(path) {
        return Ok(absolute.into());
    }

    let base_url = Url::parse(base).with_context(|| format!("invalid base url {base:?}"))?;
    let joined = base_url
        .join(path)
        .with_context(|| format!("resolving {path:?} against {base}"))?;
    Ok(joined.into())
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => parse_iso_utc(raw).or_else(|| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn render_error(helper: &str, err: anyhow::Error) -> RenderError {
    RenderErrorReason::Other(format!("{helper}: {err:#}")).into()
}

fn readable_date_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("readableDate", 0))?
        .value();
    let formatted = readable_date(value).map_err(|e| render_error("readableDate", e))?;
    out.write(&formatted)?;
    Ok(())
}

fn ymd_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let null = Value::Null;
    let value = h.param(0).map(|p| p.value()).unwrap_or(&null);
    let formatted = ymd(value).map_err(|e| render_error("ymd", e))?;
    out.write(&formatted)?;
    Ok(())
}

struct AbsoluteUrl {
    default_base: String,
}

impl HelperDef for AbsoluteUrl {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let path = match h.param(0).map(|p| p.value()) {
            None => String::new(),
            Some(v) if is_falsy(v) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        // Only an omitted base falls back to the site's; a passed one must be a string.
        let base = match h.param(1).map(|p| p.value()) {
            None => self.default_base.as_str(),
            Some(Value::String(base)) => base.as_str(),
            Some(other) => {
                return Err(RenderErrorReason::Other(format!(
                    "absoluteUrl: base must be a url string, got {other}"
                ))
                .into());
            }
        };

        let url = absolute_url(&path, base).map_err(|e| render_error("absoluteUrl", e))?;
        out.write(&url)?;
        Ok(())
    }
}

/// Inlines a stylesheet, relative to the project root, as a `<style>` element.
struct InlineCss {
    root: PathBuf,
}

impl HelperDef for InlineCss {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let rel = h
            .param(0)
            .and_then(|p| p.value().as_str())
            .ok_or_else(|| {
                RenderErrorReason::Other("inlineCss: expected a stylesheet path".into())
            })?;
        let path = self.root.join(rel);
        let css = fs::read_to_string(&path)
            .with_context(|| format!("reading stylesheet at {}", path.display()))
            .map_err(|e| render_error("inlineCss", e))?;

        out.write("<style>")?;
        out.write(&css)?;
        out.write("</style>")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry(config: &SiteConfig) -> Handlebars<'static> {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(false);
        register_filters(&mut hb, config);
        hb
    }

    #[test]
    fn ymd_of_nothing_is_empty() {
        assert_eq!(ymd(&Value::Null).unwrap(), "");
        assert_eq!(ymd(&json!("")).unwrap(), "");
        assert_eq!(ymd(&json!(false)).unwrap(), "");
    }

    #[test]
    fn ymd_formats_in_utc() {
        assert_eq!(ymd(&json!("2024-03-05T00:00:00Z")).unwrap(), "2024-03-05");
        assert_eq!(ymd(&json!("2024-03-05T23:30:00-02:00")).unwrap(), "2024-03-06");
        assert_eq!(ymd(&json!("2024-03-05")).unwrap(), "2024-03-05");
        assert_eq!(ymd(&json!(1_709_596_800_000i64)).unwrap(), "2024-03-05");
    }

    #[test]
    fn readable_date_rejects_garbage() {
        assert!(readable_date(&json!("soon")).is_err());
        assert!(readable_date(&Value::Null).is_err());
        assert!(ymd(&json!("soon")).is_err());
    }

    #[test]
    fn absolute_url_resolution() {
        assert_eq!(absolute_url("", "https://x.com/").unwrap(), "https://x.com/");
        assert_eq!(absolute_url("/a", "https://x.com/").unwrap(), "https://x.com/a");
        assert_eq!(
            absolute_url("feed.xml", "https://x.com/blog/").unwrap(),
            "https://x.com/blog/feed.xml"
        );
        assert_eq!(
            absolute_url("https://other.org/p", "not a url").unwrap(),
            "https://other.org/p"
        );
        assert_eq!(absolute_url("", "not a url").unwrap(), "not a url");
        assert!(absolute_url("/a", "not a url").is_err());
    }

    #[test]
    fn helpers_render_in_templates() {
        let config = SiteConfig::default();
        let hb = registry(&config);
        let data = json!({ "created": "2021-01-02T03:04:05Z", "missing": null });

        let rendered = hb
            .render_template(
                "{{readableDate created}}|{{ymd missing}}|{{absoluteUrl \"/x\" \"https://x.com/\"}}",
                &data,
            )
            .unwrap();
        assert_eq!(rendered, "2021-01-02||https://x.com/x");
    }

    #[test]
    fn absolute_url_defaults_to_site_base() {
        let mut config = SiteConfig::default();
        config.site.base_url = "https://garden.example/".into();
        let hb = registry(&config);

        let rendered = hb
            .render_template("{{absoluteUrl \"notes/\"}}|{{absoluteUrl \"\"}}", &json!({}))
            .unwrap();
        assert_eq!(rendered, "https://garden.example/notes/|https://garden.example/");
    }

    #[test]
    fn invalid_base_fails_the_render() {
        let hb = registry(&SiteConfig::default());
        let err = hb
            .render_template("{{absoluteUrl \"/a\" \"nope\"}}", &json!({}))
            .unwrap_err();
        assert!(err.to_string().contains("absoluteUrl"));
    }

    #[test]
    fn passed_base_that_is_not_a_string_fails_the_render() {
        let hb = registry(&SiteConfig::default());
        let data = json!({ "base": 42 });

        assert!(hb.render_template("{{absoluteUrl \"/a\" base}}", &data).is_err());
        assert!(hb.render_template("{{absoluteUrl \"/a\" missing}}", &data).is_err());
        assert_eq!(
            hb.render_template("{{absoluteUrl \"/a\"}}", &data).unwrap(),
            "http://localhost:8080/a"
        );
    }

    #[test]
    fn inline_css_wraps_file_in_style_tag() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/assets/css")).unwrap();
        fs::write(dir.path().join("src/assets/css/site.css"), "body{margin:0}").unwrap();

        let mut config = SiteConfig::default();
        config.vcs.repository_root = dir.path().to_string_lossy().into_owned();
        let hb = registry(&config);

        let rendered = hb
            .render_template("{{inlineCss \"src/assets/css/site.css\"}}", &json!({}))
            .unwrap();
        assert_eq!(rendered, "<style>body{margin:0}</style>");

        assert!(hb.render_template("{{inlineCss \"src/assets/css/gone.css\"}}", &json!({})).is_err());
    }
}
