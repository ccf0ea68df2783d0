//! Deploy operations.

use std::fmt;

use chrono::{DateTime, TimeZone};
use forcecmd_xml::{escape, escape_attribute, XmlObject, XmlValue};
use serde::Serialize;
use tracing::info;

use crate::client::MetadataApi;
use crate::error::{Error, ErrorKind, Result};
use crate::job::{Job, JobKind};
use crate::poller::JobPoller;

/// Test level for deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestLevel {
    NoTestRun,
    RunLocalTests,
    RunAllTestsInOrg,
    RunSpecifiedTests,
}

impl fmt::Display for TestLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestLevel::NoTestRun => write!(f, "NoTestRun"),
            TestLevel::RunLocalTests => write!(f, "RunLocalTests"),
            TestLevel::RunAllTestsInOrg => write!(f, "RunAllTestsInOrg"),
            TestLevel::RunSpecifiedTests => write!(f, "RunSpecifiedTests"),
        }
    }
}

/// Options for deployment.
///
/// Only options that were set are sent; the server applies its own defaults
/// to the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    options: XmlObject,
}

impl DeployOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from a JSON object such as
    /// `{"checkOnly": true, "testLevel": "RunLocalTests"}`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match XmlValue::from_json(json) {
            XmlValue::Object(options) if json.is_object() => Ok(Self { options }),
            _ => Err(Error::new(ErrorKind::InvalidRequest(format!(
                "deploy options must be a JSON object, got {json}"
            )))),
        }
    }

    /// Set any option by its API name.
    pub fn set(mut self, name: &str, value: impl Into<XmlValue>) -> Self {
        self.options.insert(name, value);
        self
    }

    /// Validate only, don't actually deploy.
    pub fn check_only(self, check_only: bool) -> Self {
        self.set("checkOnly", check_only)
    }

    pub fn ignore_warnings(self, ignore_warnings: bool) -> Self {
        self.set("ignoreWarnings", ignore_warnings)
    }

    /// Rollback all changes if any component fails.
    pub fn rollback_on_error(self, rollback_on_error: bool) -> Self {
        self.set("rollbackOnError", rollback_on_error)
    }

    pub fn test_level(self, test_level: TestLevel) -> Self {
        self.set("testLevel", test_level.to_string())
    }

    /// Tests to run with [`TestLevel::RunSpecifiedTests`].
    pub fn run_tests(self, tests: Vec<String>) -> Self {
        self.set("runTests", tests)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub(crate) fn to_xml(&self) -> XmlValue {
        self.options.clone().into()
    }
}

/// What a deploy reports back: the status, failed components and failed
/// tests, as the server described them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploySummary {
    pub status: String,
    pub errors: Vec<serde_json::Value>,
    #[serde(rename = "testErrors")]
    pub test_errors: Vec<serde_json::Value>,
}

/// A finished deployment.
#[derive(Debug, Clone)]
pub struct DeployResult {
    pub job: Job,
}

impl DeployResult {
    pub fn from_job(job: Job) -> Self {
        Self { job }
    }

    pub fn success(&self) -> bool {
        self.job.success
    }

    /// `details`, which repeats once per deployed package.
    pub fn details(&self) -> &[XmlValue] {
        self.job.payload["details"].as_array()
    }

    pub fn component_failures(&self) -> Vec<&XmlValue> {
        self.details()
            .iter()
            .flat_map(|d| d["componentFailures"].as_array())
            .collect()
    }

    pub fn test_failures(&self) -> Vec<&XmlValue> {
        self.details()
            .iter()
            .flat_map(|d| d["runTestResult"]["failures"].as_array())
            .collect()
    }

    pub fn summary(&self) -> DeploySummary {
        DeploySummary {
            status: self.job.status_text.clone().unwrap_or_default(),
            errors: self.component_failures().into_iter().map(XmlValue::to_json).collect(),
            test_errors: self.test_failures().into_iter().map(XmlValue::to_json).collect(),
        }
    }

    /// The summary, or [`ErrorKind::DeployFailed`] carrying it when the
    /// deploy did not succeed.
    pub fn into_summary(self) -> Result<DeploySummary> {
        let summary = self.summary();
        if self.success() {
            Ok(summary)
        } else {
            Err(Error::new(ErrorKind::DeployFailed(Box::new(summary))))
        }
    }

    /// The test results as a JUnit report, with timestamps in `tz`.
    pub fn junit_report<'a, Tz>(&'a self, hostname: &'a str, tz: &Tz) -> JunitReport<'a>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let timestamp = self.job.payload["startDate"]
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|start| {
                start
                    .with_timezone(tz)
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default();

        JunitReport {
            result: self,
            hostname,
            timestamp,
        }
    }
}

/// JUnit XML (`testsuites`) for the `runTestResult` of each deployed
/// package, written through `Display`.
#[derive(Debug)]
pub struct JunitReport<'a> {
    result: &'a DeployResult,
    hostname: &'a str,
    timestamp: String,
}

/// `namespace.name`, or just `name` without a namespace.
fn qualified(namespace: &XmlValue, name: &str) -> String {
    match namespace.as_str().filter(|ns| !ns.is_empty()) {
        Some(ns) => format!("{ns}.{name}"),
        None => name.to_string(),
    }
}

fn attr(value: &XmlValue) -> String {
    escape_attribute(value.as_str().unwrap_or_default())
}

impl fmt::Display for JunitReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<testsuites>")?;
        let suites = self
            .result
            .details()
            .iter()
            .map(|d| &d["runTestResult"])
            .filter(|r| !r.is_nil());

        for (index, run) in suites.enumerate() {
            writeln!(
                f,
                r#"  <testsuite package="details" id="{index}" name="runTestResult" timestamp="{}" hostname="{}" tests="{}" failures="{}" errors="0" time="{}">"#,
                escape_attribute(&self.timestamp),
                escape_attribute(self.hostname),
                attr(&run["numTestsRun"]),
                attr(&run["numFailures"]),
                attr(&run["totalTime"]),
            )?;
            writeln!(f, "    <properties>")?;
            writeln!(
                f,
                r#"      <property name="apexLogId" value="{}"/>"#,
                attr(&run["apexLogId"])
            )?;
            writeln!(f, "    </properties>")?;

            for warning in run["codeCoverageWarnings"].as_array() {
                writeln!(
                    f,
                    r#"    <testcase name="CodeCoverageWarning" classname="{}" time="0">"#,
                    escape_attribute(&qualified(&warning["namespace"], "CodeCoverageWarning"))
                )?;
                writeln!(
                    f,
                    r#"      <failure message="{}" type="CodeCoverageWarning"/>"#,
                    attr(&warning["message"])
                )?;
                writeln!(f, "    </testcase>")?;
            }

            for failure in run["failures"].as_array() {
                writeln!(
                    f,
                    r#"    <testcase name="{}" classname="{}" time="{}">"#,
                    attr(&failure["methodName"]),
                    escape_attribute(&qualified(
                        &failure["namespace"],
                        failure["name"].as_str().unwrap_or_default()
                    )),
                    attr(&failure["time"]),
                )?;
                writeln!(
                    f,
                    r#"      <failure message="{}" type="RunTestFailure">{}</failure>"#,
                    attr(&failure["message"]),
                    escape(failure["stackTrace"].as_str().unwrap_or_default())
                )?;
                writeln!(f, "    </testcase>")?;
            }

            for warning in run["flowCoverageWarnings"].as_array() {
                let flow_name = warning["flowName"].as_str().unwrap_or_default();
                writeln!(
                    f,
                    r#"    <testcase name="{}" classname="{}" time="0">"#,
                    escape_attribute(flow_name),
                    escape_attribute(&qualified(&warning["flowNamespace"], flow_name))
                )?;
                writeln!(
                    f,
                    r#"      <failure message="{}" type="FlowCoverageWarning"/>"#,
                    attr(&warning["message"])
                )?;
                writeln!(f, "    </testcase>")?;
            }

            for success in run["successes"].as_array() {
                writeln!(
                    f,
                    r#"    <testcase name="{}" classname="{}" time="{}"/>"#,
                    attr(&success["methodName"]),
                    escape_attribute(&qualified(
                        &success["namespace"],
                        success["name"].as_str().unwrap_or_default()
                    )),
                    attr(&success["time"]),
                )?;
            }
            writeln!(f, "  </testsuite>")?;
        }
        writeln!(f, "</testsuites>")
    }
}

/// Deploy `zip` and wait for the deployment to finish.
///
/// A deployment that finished unsuccessfully is returned, not an error; see
/// [`DeployResult::into_summary`].
pub async fn deploy_and_await<A: MetadataApi>(
    api: &A,
    poller: &JobPoller,
    zip: &[u8],
    options: &DeployOptions,
) -> Result<DeployResult> {
    info!(bytes = zip.len(), "Deploy");
    let job = poller
        .submit_and_await(
            JobKind::Deploy,
            move || api.deploy(zip, options),
            move |id| async move { api.check_deploy_status(&id).await },
        )
        .await?;
    Ok(DeployResult::from_job(job))
}
