use std::io::Write;

use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};

use crate::dates::normalize_dates;
use crate::error::Result;
use crate::metrics::{self, JoinReport, TopItem};
use crate::report::Reporter;
use crate::schema::{TableSpec, CLIENTS, ITEMS, TICKETS, VENTAS_POR_CLIENTE, VENTAS_POR_DIA};
use crate::tables::TableStore;

#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenTable {
    pub key: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub inputs: Vec<TableCount>,
    pub outputs: Vec<WrittenTable>,
    pub top_item: Option<TopItem>,
    pub join_reports: Vec<JoinReport>,
}

struct Extracted {
    tickets: DataFrame,
    items: DataFrame,
    clients: DataFrame,
}

struct Derived {
    sales_by_client: DataFrame,
    sales_by_day: DataFrame,
    top_item: Option<TopItem>,
    join_reports: Vec<JoinReport>,
}

/// One extract-transform-load pass. Nothing is written unless every earlier step succeeds.
pub async fn run<W: Write>(store: &TableStore, reporter: &mut Reporter<W>) -> Result<RunSummary> {
    let extracted = extract(store, reporter).await?;
    let inputs = vec![
        count(&TICKETS, &extracted.tickets),
        count(&ITEMS, &extracted.items),
        count(&CLIENTS, &extracted.clients),
    ];

    let derived = transform(extracted, reporter)?;

    let outputs = vec![
        load(store, &derived.sales_by_client, &VENTAS_POR_CLIENTE).await?,
        load(store, &derived.sales_by_day, &VENTAS_POR_DIA).await?,
    ];

    Ok(RunSummary {
        inputs,
        outputs,
        top_item: derived.top_item,
        join_reports: derived.join_reports,
    })
}

async fn extract<W: Write>(store: &TableStore, reporter: &mut Reporter<W>) -> Result<Extracted> {
    let tickets = store.read_typed(&TICKETS).await?;
    let items = store.read_typed(&ITEMS).await?;
    let clients = store.read_typed(&CLIENTS).await?;

    reporter.head(TICKETS.label, &tickets);
    reporter.head(ITEMS.label, &items);
    reporter.head(CLIENTS.label, &clients);

    Ok(Extracted {
        tickets,
        items,
        clients,
    })
}

fn transform<W: Write>(extracted: Extracted, reporter: &mut Reporter<W>) -> Result<Derived> {
    let Extracted {
        mut tickets,
        mut items,
        mut clients,
    } = extracted;

    for (spec, df) in [
        (&TICKETS, &mut tickets),
        (&ITEMS, &mut items),
        (&CLIENTS, &mut clients),
    ] {
        for column in spec.date_columns() {
            normalize_dates(df, column)?;
        }
    }

    let by_client = metrics::sales_by_client(&tickets, &clients)?;
    reporter.frame(VENTAS_POR_CLIENTE.label, &by_client.value);

    let top = metrics::top_selling_item(&tickets, &items)?;
    reporter.top_item(top.value.as_ref());

    let stock = metrics::adjusted_stock(&items, &tickets)?;
    reporter.frame("Stock actual", &stock);

    let by_type = metrics::sales_by_client_type(&tickets, &clients)?;
    reporter.frame("Ventas por tipo de cliente", &by_type.value);

    let by_day = metrics::sales_by_day(&tickets)?;
    reporter.frame(VENTAS_POR_DIA.label, &by_day);

    let join_reports = vec![by_client.report, top.report, by_type.report];
    for report in join_reports.iter().filter(|report| !report.is_clean()) {
        warn!(
            join = report.join,
            key = report.key,
            dropped = report.unmatched_rows,
            of = report.left_rows,
            missing = ?report.missing_keys,
            "inner join dropped rows without a match"
        );
    }

    info!(
        clients = by_client.value.height(),
        days = by_day.height(),
        items = stock.height(),
        "transform complete"
    );

    Ok(Derived {
        sales_by_client: by_client.value,
        sales_by_day: by_day,
        top_item: top.value,
        join_reports,
    })
}

async fn load(store: &TableStore, df: &DataFrame, spec: &TableSpec) -> Result<WrittenTable> {
    let key = store.write_table(df, spec.file_name).await?;
    Ok(WrittenTable {
        key,
        rows: df.height(),
    })
}

fn count(spec: &TableSpec, df: &DataFrame) -> TableCount {
    TableCount {
        name: spec.file_name.to_string(),
        rows: df.height(),
    }
}
