use crate::error::LoadError;
use core_types::{Record, TableName};
use database::{describe_table, Connector, InsertStatement, Session};

/// Introspects `table` and builds an INSERT over exactly its columns.
/// Tables with an identity column get it dropped from the list.
pub async fn prepare_insert(
    session: &mut dyn Session,
    table: TableName,
) -> Result<InsertStatement, LoadError> {
    let columns = describe_table(session, table.as_str()).await?;
    let statement =
        InsertStatement::from_columns(table.as_str(), &columns, table.has_identity_column())?;
    Ok(statement)
}

/// The common load cycle: connect, introspect, order each record by the
/// introspected columns, insert, commit, close.
pub async fn load_records(
    connector: &dyn Connector,
    table: TableName,
    records: &[Record],
) -> Result<u64, LoadError> {
    let mut session = connector.connect().await?;
    let statement = prepare_insert(session.as_mut(), table).await?;
    let rows = statement.rows_from(records)?;

    let inserted = session.insert_batch(&statement, &rows).await?;
    session.commit().await?;
    session.close().await?;

    tracing::info!(table = %table, rows = inserted, "Loaded rows.");
    Ok(inserted)
}
