use std::str::FromStr;
use std::sync::Arc;

use crate::commands::{open_migrated, prepare, CommandResult, Failure};
use stockroom_core::domain::report::ReportType;
use stockroom_core::inventory::{InventoryOperations, ReportRequest};
use stockroom_db::SqlInventoryStore;

pub fn run(report_type: &str, days: Option<u32>) -> CommandResult {
    let report_type = match ReportType::from_str(report_type) {
        Ok(report_type) => report_type,
        Err(error) => return CommandResult::failure("report", "invalid_argument", error.to_string(), 8),
    };

    let (config, runtime) = match prepare("report") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;
        let operations = InventoryOperations::new(Arc::new(SqlInventoryStore::new(pool.clone())));
        let report = operations
            .inventory_report(ReportRequest { report_type, days })
            .await
            .map_err(|error| ("report_generation", error.to_string(), 7u8));
        pool.close().await;

        let report = report?;
        serde_json::to_string(&report)
            .map_err(|error| -> Failure { ("serialization", error.to_string(), 7) })
    });

    match result {
        Ok(rendered) => CommandResult::success("report", rendered),
        Err(failure) => CommandResult::from_failure("report", failure),
    }
}
