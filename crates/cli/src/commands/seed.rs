use smiles_core::clock::{Clock, SystemClock};
use smiles_db::{migrations, BookingSeedInfo, DataSourceResolver, DemoDataset};

use crate::commands::{prepare, CommandResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let resolver = DataSourceResolver::from_config(&config);
        let pool =
            resolver.resolve().await.map_err(|error| ("datasource", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoDataset::load(&pool, SystemClock.today())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(SeedOutput {
                inserted: seed_result.bookings_inserted,
                bookings: seed_result.bookings,
            })
        } else {
            Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => CommandResult::success("seed", output.message()),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    inserted: usize,
    bookings: Vec<BookingSeedInfo>,
}

impl SeedOutput {
    fn message(&self) -> String {
        let lines = self
            .bookings
            .iter()
            .map(|b| {
                format!(
                    "  - {}: {} {}..{} ({})",
                    b.booking_number, b.customer, b.start, b.end, b.description
                )
            })
            .collect::<Vec<_>>();
        format!(
            "demo dataset ready ({} new bookings):\n{}",
            self.inserted,
            lines.join("\n")
        )
    }
}

fn verification_failure_message(checks: &[(&str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_failure_message;

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("Bond", true), ("BK100", false), ("456-789", false)];

        assert_eq!(
            verification_failure_message(&checks),
            "Seed verification failed for checks: BK100, 456-789"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("Bond", true), ("BK100", true)];

        assert_eq!(verification_failure_message(&checks), "Some seed data failed to load");
    }
}
