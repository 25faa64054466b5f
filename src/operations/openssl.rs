use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::validation::{check_not_flag, ValidationError};
use super::{OperationPlan, PlanOperation};
use crate::parsers::OutputDialect;

const OPENSSL: &str = "openssl";

fn required_path<'a>(
    field: &'static str,
    path: Option<&'a PathBuf>,
) -> Result<&'a Path, ValidationError> {
    match path {
        Some(path) if !path.as_os_str().is_empty() => {
            check_not_flag(field, &path.to_string_lossy())?;
            Ok(path)
        }
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SslCertViewParams {
    pub cert_path: Option<PathBuf>,
    /// Add the SHA-256 fingerprint
    pub fingerprint: bool,
}

impl PlanOperation for SslCertViewParams {
    const NAME: &'static str = "ssl_cert_view";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "Subject, issuer, validity and serial of a certificate";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let cert = required_path("cert_path", self.cert_path.as_ref())?;
        Ok(Self::base_plan(OPENSSL)
            .args(["x509", "-in"])
            .arg(path_arg(cert))
            .args(["-noout", "-subject", "-issuer", "-dates", "-serial"])
            .flag(self.fingerprint, "-fingerprint")
            .flag(self.fingerprint, "-sha256")
            .dialect(OutputDialect::KeyValue))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SslCertVerifyParams {
    pub cert_path: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    /// Intermediate certificates
    pub untrusted_path: Option<PathBuf>,
}

impl PlanOperation for SslCertVerifyParams {
    const NAME: &'static str = "ssl_cert_verify";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "Verify a certificate chain";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let cert = required_path("cert_path", self.cert_path.as_ref())?;
        let ca = self
            .ca_path
            .as_ref()
            .map(|p| required_path("ca_path", Some(p)))
            .transpose()?;
        let untrusted = self
            .untrusted_path
            .as_ref()
            .map(|p| required_path("untrusted_path", Some(p)))
            .transpose()?;

        Ok(Self::base_plan(OPENSSL)
            .arg("verify")
            .option("-CAfile", ca.map(path_arg))
            .option("-untrusted", untrusted.map(path_arg))
            .arg(path_arg(cert))
            .dialect(OutputDialect::Lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cert_view_plan() {
        let params = SslCertViewParams {
            cert_path: Some(PathBuf::from("/etc/ssl/server.pem")),
            fingerprint: false,
        };
        let plan = params.plan().unwrap();
        assert_eq!(
            plan.args,
            vec![
                "x509",
                "-in",
                "/etc/ssl/server.pem",
                "-noout",
                "-subject",
                "-issuer",
                "-dates",
                "-serial"
            ]
        );
        assert!(matches!(plan.dialect, OutputDialect::KeyValue));
    }

    #[test]
    fn test_cert_verify_plan() {
        let params = SslCertVerifyParams {
            cert_path: Some(PathBuf::from("leaf.pem")),
            ca_path: Some(PathBuf::from("ca.pem")),
            untrusted_path: None,
        };
        assert_eq!(
            params.plan().unwrap().args,
            vec!["verify", "-CAfile", "ca.pem", "leaf.pem"]
        );
    }

    #[test]
    fn test_cert_path_is_required() {
        assert_eq!(
            SslCertVerifyParams::default().plan().unwrap_err(),
            ValidationError::MissingField { field: "cert_path" }
        );
        let flag_like = SslCertVerifyParams {
            cert_path: Some(PathBuf::from("-help")),
            ..Default::default()
        };
        assert!(flag_like.plan().is_err());
    }
}
