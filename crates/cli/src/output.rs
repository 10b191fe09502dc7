use crate::error::CliError;
use model::{execution::result::JobResult, partition::descriptor::PartitionDescriptor};

pub fn print_job_result(result: &JobResult, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "job {}  status {}{}  duration {:.2?}",
        result.job_id,
        result.status,
        if result.aborted { " (aborted)" } else { "" },
        result.duration
    );
    println!(
        "{:<14} {:<10} {:>10} {:>10} {:>9} {:>8} {:>8}",
        "PARTITION", "STATUS", "READ", "WRITTEN", "FILTERED", "RETRIES", "FAILED"
    );
    for p in &result.partitions {
        println!(
            "{:<14} {:<10} {:>10} {:>10} {:>9} {:>8} {:>8}",
            p.partition_id,
            p.status.as_str(),
            p.read_count,
            p.write_count,
            p.filter_count,
            p.retry_count,
            p.failure_count
        );
    }
    println!(
        "{:<14} {:<10} {:>10} {:>10}",
        "TOTAL",
        "",
        result.read_count(),
        result.write_count()
    );

    for failed in result.failed_partitions() {
        if let Some(error) = &failed.error {
            println!("{}: {error}", failed.partition_id);
        }
    }
    Ok(())
}

pub fn print_plan(partitions: &[PartitionDescriptor], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(partitions)?);
        return Ok(());
    }

    println!("{:<14} {:>12} {:>12}", "PARTITION", "START_AT", "ITEM_COUNT");
    for p in partitions {
        println!(
            "{:<14} {:>12} {:>12}",
            p.partition_id, p.start_offset, p.item_count
        );
    }
    Ok(())
}
