use crate::commands::{open_migrated, prepare, CommandResult, Failure};
use stockroom_db::{DemoSeedDataset, SeedResult, VerificationResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;

        let seeded = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;
        check_verification(&verification)?;
        Ok::<SeedResult, Failure>(seeded)
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn check_verification(verification: &VerificationResult) -> Result<(), Failure> {
    if verification.passed() {
        return Ok(());
    }
    Err((
        "seed_verification",
        format!("Seed verification failed for checks: {}", verification.failed.join(", ")),
        6,
    ))
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo inventory loaded: {} products, {} customers, {} sales, {} stock movements",
        seeded.products_seeded,
        seeded.customers_seeded,
        seeded.sales_seeded,
        seeded.movements_seeded
    )
}
