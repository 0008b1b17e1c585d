use chrono_tz::Tz;

use crate::bot::{models::Session, optimizer::Settlement, processor::TransactionRow};

use super::time::reformat_datetime;

/* Session report.
 * A CSV document with the session header, every transaction and the settlement plan.
 */
pub fn build_report(
    session: &Session,
    rows: &[TransactionRow],
    settlement: &Settlement,
    time_zone: Tz,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(["Session Report", session.name.as_str()])?;
    writer.write_record([
        "Created",
        reformat_datetime(&session.created_at, time_zone).as_str(),
    ])?;
    if let Some(ended_at) = &session.ended_at {
        writer.write_record(["Ended", reformat_datetime(ended_at, time_zone).as_str()])?;
    }
    let total_expenses = settlement
        .summary
        .as_ref()
        .map(|summary| summary.total_expenses)
        .unwrap_or_default();
    writer.write_record(["Total Expenses", total_expenses.to_string().as_str()])?;
    writer.write_record([""])?;

    writer.write_record(["No.", "Payer", "Consumer", "Description", "Amount"])?;
    for row in rows {
        writer.write_record([
            row.number.to_string().as_str(),
            row.payer.as_str(),
            row.consumer.as_str(),
            row.description.as_str(),
            row.amount.to_string().as_str(),
        ])?;
    }
    writer.write_record([""])?;

    writer.write_record(["From", "To", "Amount"])?;
    for payment in &settlement.plan {
        writer.write_record([
            payment.from.as_str(),
            payment.to.as_str(),
            payment.amount.to_string().as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

pub fn report_file_name(session: &Session) -> String {
    let name: String = session
        .name
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join("_");
    format!("Report_{name}.csv")
}
