use serde::Serialize;
use smiles_core::config::{AppConfig, LoadOptions};
use smiles_db::{ConfiguredRegistry, DataSourceResolver, DbPool};

const REQUIRED_TABLES: &[&str] = &["customer", "booking"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn passed(&self) -> bool {
        self.overall_status == CheckStatus::Pass
    }
}

/// Returns the rendered report and whether every check passed.
pub fn run(json_output: bool) -> (String, bool) {
    let report = build_report();
    let passed = report.passed();

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return (output, passed);
    }

    (render_human(&report), passed)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bindings(&config));
            checks.extend(check_data_source(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("datasource_bindings", reason));
            checks.push(DoctorCheck::skipped("datasource_resolution", reason));
            checks.push(DoctorCheck::skipped("booking_schema", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_bindings(config: &AppConfig) -> DoctorCheck {
    let registry = ConfiguredRegistry::from_config(config);
    let scoped = config.datasource.scoped_name.as_str();
    let global = config.datasource.global_name.as_str();

    let describe = |name: &str| match registry.binding(name) {
        Some(url) => format!("`{name}` -> `{url}`"),
        None => format!("`{name}` unbound"),
    };
    let details = format!("{}; {}", describe(scoped), describe(global));

    let any_bound = registry.binding(scoped).is_some() || registry.binding(global).is_some();
    let status = if any_bound { CheckStatus::Pass } else { CheckStatus::Fail };

    DoctorCheck { name: "datasource_bindings", status, details }
}

fn check_data_source(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "datasource_resolution",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck::skipped("booking_schema", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let resolver = DataSourceResolver::from_config(config);
        let pool = match resolver.resolve().await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "datasource_resolution",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    },
                    DoctorCheck::skipped("booking_schema", "the data source did not resolve"),
                ];
            }
        };

        let checks = vec![
            match probe(&pool).await {
                Ok(()) => DoctorCheck {
                    name: "datasource_resolution",
                    status: CheckStatus::Pass,
                    details: format!(
                        "resolved via `{}` or `{}` and answered a probe query",
                        resolver.scoped_name(),
                        resolver.global_name()
                    ),
                },
                Err(details) => {
                    DoctorCheck { name: "datasource_resolution", status: CheckStatus::Fail, details }
                }
            },
            check_schema(&pool).await,
        ];

        pool.close().await;
        checks
    })
}

async fn probe(pool: &DbPool) -> Result<(), String> {
    smiles_db::connection::ping(pool).await.map_err(|error| format!("probe query failed: {error}"))
}

async fn check_schema(pool: &DbPool) -> DoctorCheck {
    let mut missing = Vec::new();
    for table in REQUIRED_TABLES {
        match smiles_db::connection::table_exists(pool, table).await {
            Ok(true) => {}
            Ok(false) => missing.push(*table),
            Err(error) => {
                return DoctorCheck {
                    name: "booking_schema",
                    status: CheckStatus::Fail,
                    details: format!("could not inspect schema: {error}"),
                };
            }
        }
    }

    if missing.is_empty() {
        DoctorCheck {
            name: "booking_schema",
            status: CheckStatus::Pass,
            details: "customer and booking tables present".to_string(),
        }
    } else {
        DoctorCheck {
            name: "booking_schema",
            status: CheckStatus::Fail,
            details: format!("missing tables: {} (run `smiles migrate`)", missing.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
