//! Business aggregates over the extracted tickets, items and clients frames.
//!
//! Each enrichment join is an inner join; the rows it drops are counted in a
//! [`JoinReport`] so callers can surface them instead of losing them silently.

use std::collections::BTreeSet;

use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::schema::{
    APELLIDO, CANTIDAD, FECHA, ID_ARTICULO, ID_CLIENTE, NOMBRE, NOMBRE_ARTICULO, STOCK,
    STOCK_ACTUAL, TIPO_CLIENTE, TOTAL,
};

const ROW_ORDER: &str = "__row_order";

/// Left-side rows an inner join discarded because their key had no match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub join: &'static str,
    pub key: &'static str,
    pub left_rows: usize,
    pub unmatched_rows: usize,
    pub missing_keys: Vec<String>,
}

impl JoinReport {
    pub fn is_clean(&self) -> bool {
        self.unmatched_rows == 0
    }
}

#[derive(Debug, Clone)]
pub struct Enriched<T> {
    pub value: T,
    pub report: JoinReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    pub item_id: String,
    pub name: Option<String>,
    pub quantity: i64,
}

fn unmatched_rows(
    join: &'static str,
    left: &DataFrame,
    right: &DataFrame,
    key: &'static str,
) -> Result<JoinReport> {
    let dropped = left
        .clone()
        .lazy()
        .select([col(key)])
        .join(
            right.clone().lazy().select([col(key)]),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Anti),
        )
        .collect()?;

    let missing_keys: BTreeSet<String> = dropped
        .column(key)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();

    Ok(JoinReport {
        join,
        key,
        left_rows: left.height(),
        unmatched_rows: dropped.height(),
        missing_keys: missing_keys.into_iter().collect(),
    })
}

fn units_sold(tickets: &DataFrame) -> LazyFrame {
    tickets
        .clone()
        .lazy()
        .filter(col(ID_ARTICULO).is_not_null())
        .group_by([col(ID_ARTICULO)])
        .agg([col(CANTIDAD).sum()])
}

/// `ID_Cliente, Total, Nombre, Apellido`, one row per client with at least one ticket.
pub fn sales_by_client(tickets: &DataFrame, clients: &DataFrame) -> Result<Enriched<DataFrame>> {
    let report = unmatched_rows("sales_by_client", tickets, clients, ID_CLIENTE)?;

    let names = clients
        .clone()
        .lazy()
        .select([col(ID_CLIENTE), col(NOMBRE), col(APELLIDO)]);

    let frame = tickets
        .clone()
        .lazy()
        .filter(col(ID_CLIENTE).is_not_null())
        .group_by([col(ID_CLIENTE)])
        .agg([col(TOTAL).sum()])
        .join(
            names,
            [col(ID_CLIENTE)],
            [col(ID_CLIENTE)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([ID_CLIENTE], SortMultipleOptions::default())
        .collect()?;

    Ok(Enriched {
        value: frame,
        report,
    })
}

/// Item with the largest summed quantity; ties go to the smallest item id.
pub fn top_selling_item(tickets: &DataFrame, items: &DataFrame) -> Result<Enriched<Option<TopItem>>> {
    let report = unmatched_rows("top_selling_item", tickets, items, ID_ARTICULO)?;

    let names = items
        .clone()
        .lazy()
        .select([col(ID_ARTICULO), col(NOMBRE_ARTICULO)]);

    let ranked = units_sold(tickets)
        .join(
            names,
            [col(ID_ARTICULO)],
            [col(ID_ARTICULO)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort(
            [CANTIDAD, ID_ARTICULO],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .limit(1)
        .collect()?;

    if ranked.height() == 0 {
        return Ok(Enriched {
            value: None,
            report,
        });
    }

    let ids = ranked.column(ID_ARTICULO)?.str()?;
    let names = ranked.column(NOMBRE_ARTICULO)?.str()?;
    let quantities = ranked.column(CANTIDAD)?.i64()?;

    let value = match (ids.get(0), quantities.get(0)) {
        (Some(item_id), Some(quantity)) => Some(TopItem {
            item_id: item_id.to_string(),
            name: names.get(0).map(str::to_string),
            quantity,
        }),
        _ => None,
    };

    Ok(Enriched { value, report })
}

/// `ID_Articulo, Nombre_Articulo, Stock, Stock_Actual` in inventory order.
///
/// Items without tickets keep their stock. Oversold items go negative.
pub fn adjusted_stock(items: &DataFrame, tickets: &DataFrame) -> Result<DataFrame> {
    let frame = items
        .clone()
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(
            units_sold(tickets),
            [col(ID_ARTICULO)],
            [col(ID_ARTICULO)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column((col(STOCK) - col(CANTIDAD).fill_null(lit(0i64))).alias(STOCK_ACTUAL))
        .sort([ROW_ORDER], SortMultipleOptions::default())
        .select([
            col(ID_ARTICULO),
            col(NOMBRE_ARTICULO),
            col(STOCK),
            col(STOCK_ACTUAL),
        ])
        .collect()?;

    Ok(frame)
}

/// `Tipo_Cliente, Total` ordered by client type.
pub fn sales_by_client_type(
    tickets: &DataFrame,
    clients: &DataFrame,
) -> Result<Enriched<DataFrame>> {
    let report = unmatched_rows("sales_by_client_type", tickets, clients, ID_CLIENTE)?;

    let types = clients
        .clone()
        .lazy()
        .select([col(ID_CLIENTE), col(TIPO_CLIENTE)]);

    let frame = tickets
        .clone()
        .lazy()
        .select([col(ID_CLIENTE), col(TOTAL)])
        .join(
            types,
            [col(ID_CLIENTE)],
            [col(ID_CLIENTE)],
            JoinArgs::new(JoinType::Inner),
        )
        .filter(col(TIPO_CLIENTE).is_not_null())
        .group_by([col(TIPO_CLIENTE)])
        .agg([col(TOTAL).sum()])
        .sort([TIPO_CLIENTE], SortMultipleOptions::default())
        .collect()?;

    Ok(Enriched {
        value: frame,
        report,
    })
}

/// `Fecha, Total`, one row per distinct date, ascending.
pub fn sales_by_day(tickets: &DataFrame) -> Result<DataFrame> {
    let frame = tickets
        .clone()
        .lazy()
        .filter(col(FECHA).is_not_null())
        .group_by([col(FECHA)])
        .agg([col(TOTAL).sum()])
        .sort([FECHA], SortMultipleOptions::default())
        .collect()?;

    Ok(frame)
}
