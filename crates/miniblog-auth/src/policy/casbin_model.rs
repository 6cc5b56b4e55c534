//! Casbin model text and enforcer construction.

use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi, Model};

use miniblog_core::types::PolicyRule;

use crate::error::AuthError;

/// ACL model: exact subject, `keyMatch` object, `regexMatch` action.
pub const DEFAULT_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = r.sub == p.sub && keyMatch(r.obj, p.obj) && regexMatch(r.act, p.act)
"#;

/// Sections every model must define.
const REQUIRED_SECTIONS: [&str; 4] = ["r", "p", "e", "m"];

/// A validated model definition.
///
/// Kept as text because each snapshot builds its own [`Enforcer`], which
/// takes ownership of the parsed model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyModel {
    text: String,
}

impl Default for PolicyModel {
    fn default() -> Self {
        Self::acl()
    }
}

impl PolicyModel {
    /// The built-in ACL model.
    pub fn acl() -> Self {
        Self {
            text: DEFAULT_MODEL.to_string(),
        }
    }

    /// Parses and checks `text`.
    pub async fn from_text(text: &str) -> Result<Self, AuthError> {
        parse(text).await?;
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builds an in-memory enforcer holding exactly `rules`.
    pub(crate) async fn enforcer(&self, rules: &[PolicyRule]) -> Result<Enforcer, AuthError> {
        let model = parse(&self.text).await?;
        let mut enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .map_err(load_error)?;
        // Rules already live in the durable store; the adapter here is only
        // a sink for the enforcer.
        enforcer.enable_auto_save(false);

        if !rules.is_empty() {
            let rows: Vec<Vec<String>> = rules
                .iter()
                .map(|rule| rule.values().iter().map(|v| v.to_string()).collect())
                .collect();
            enforcer.add_policies(rows).await.map_err(load_error)?;
        }
        Ok(enforcer)
    }
}

async fn parse(text: &str) -> Result<DefaultModel, AuthError> {
    let model = DefaultModel::from_str(text).await.map_err(load_error)?;
    let sections = model.get_model();
    if let Some(missing) = REQUIRED_SECTIONS
        .iter()
        .find(|section| !sections.contains_key(**section))
    {
        return Err(AuthError::PolicyLoadError(format!(
            "model is missing the '{missing}' section"
        )));
    }
    Ok(model)
}

fn load_error(err: casbin::Error) -> AuthError {
    AuthError::PolicyLoadError(err.to_string())
}
