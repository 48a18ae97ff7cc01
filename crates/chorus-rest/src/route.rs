//! Routes - HTTP verb plus path template

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RestError;

/// HTTP verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Uppercase verb as sent on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(RestError::InvalidRequest(format!("unsupported HTTP verb: {s}"))),
        }
    }
}

/// Static description of an endpoint
///
/// `{}` placeholders in the template are filled positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub name: &'static str,
    pub method: Method,
    pub template: &'static str,
}

impl RouteSpec {
    #[must_use]
    pub const fn new(name: &'static str, method: Method, template: &'static str) -> Self {
        Self {
            name,
            method,
            template,
        }
    }

    /// Number of `{}` placeholders in the template
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.template.matches("{}").count()
    }
}

/// A concrete endpoint with its parameters filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub method: Method,
    pub template: &'static str,
    pub path: String,
}

impl Route {
    /// Fill the template of `spec` with `params`
    pub fn new(spec: &RouteSpec, params: &[&dyn fmt::Display]) -> Result<Self, RestError> {
        Self::with_method(spec, spec.method, params)
    }

    fn with_method(
        spec: &RouteSpec,
        method: Method,
        params: &[&dyn fmt::Display],
    ) -> Result<Self, RestError> {
        let expected = spec.param_count();
        if params.len() != expected {
            return Err(RestError::InvalidRequest(format!(
                "route {} takes {expected} parameters, got {}",
                spec.name,
                params.len()
            )));
        }

        let mut path = String::with_capacity(spec.template.len() + params.len() * 20);
        let mut pieces = spec.template.split("{}");
        if let Some(first) = pieces.next() {
            path.push_str(first);
        }
        for (piece, param) in pieces.zip(params) {
            path.push_str(&param.to_string());
            path.push_str(piece);
        }

        Ok(Self {
            name: spec.name,
            method,
            template: spec.template,
            path,
        })
    }

    /// Rate-limit bucket key: verb plus template, so interpolated IDs share a bucket
    #[must_use]
    pub fn bucket_key(&self) -> String {
        format!("{} {}", self.method, self.template)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Route verbs, with configured overrides applied
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    overrides: HashMap<String, Method>,
}

impl RouteTable {
    /// Build from route name → verb pairs
    pub fn new(overrides: &HashMap<String, String>) -> Result<Self, RestError> {
        let overrides = overrides
            .iter()
            .map(|(name, verb)| {
                if crate::routes::by_name(name).is_none() {
                    return Err(RestError::InvalidRequest(format!("unknown route: {name}")));
                }
                Ok((name.clone(), verb.parse::<Method>()?))
            })
            .collect::<Result<HashMap<_, _>, RestError>>()?;
        Ok(Self { overrides })
    }

    /// Verb that will be used for `spec`
    #[must_use]
    pub fn method_for(&self, spec: &RouteSpec) -> Method {
        self.overrides.get(spec.name).copied().unwrap_or(spec.method)
    }

    /// Build a route, honoring overrides
    pub fn route(&self, spec: &RouteSpec, params: &[&dyn fmt::Display]) -> Result<Route, RestError> {
        Route::with_method(spec, self.method_for(spec), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::Snowflake;

    const MESSAGE: RouteSpec = RouteSpec::new("get_channel_message", Method::Get, "/channels/{}/messages/{}");

    #[test]
    fn test_route_interpolation() {
        let route = Route::new(&MESSAGE, &[&Snowflake::new(10), &Snowflake::new(20)]).unwrap();
        assert_eq!(route.path, "/channels/10/messages/20");
        assert_eq!(route.to_string(), "GET /channels/10/messages/20");
    }

    #[test]
    fn test_bucket_key_ignores_ids() {
        let a = Route::new(&MESSAGE, &[&1, &2]).unwrap();
        let b = Route::new(&MESSAGE, &[&3, &4]).unwrap();
        assert_eq!(a.bucket_key(), b.bucket_key());
        assert_eq!(a.bucket_key(), "GET /channels/{}/messages/{}");
    }

    #[test]
    fn test_param_count_mismatch() {
        assert!(matches!(
            Route::new(&MESSAGE, &[&1]),
            Err(RestError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("FETCH".parse::<Method>().is_err());
    }

    #[test]
    fn test_route_table_override() {
        let overrides = HashMap::from([("get_channel_message".to_string(), "POST".to_string())]);
        let table = RouteTable::new(&overrides).unwrap();

        let route = table.route(&MESSAGE, &[&1, &2]).unwrap();
        assert_eq!(route.method, Method::Post);
        assert_eq!(route.bucket_key(), "POST /channels/{}/messages/{}");
    }

    #[test]
    fn test_route_table_rejects_unknown_route() {
        let overrides = HashMap::from([("launch_rockets".to_string(), "POST".to_string())]);
        assert!(RouteTable::new(&overrides).is_err());
    }
}
