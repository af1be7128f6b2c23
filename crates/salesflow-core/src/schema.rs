use polars::prelude::*;

use crate::error::{EtlError, Result};

pub const ID_CLIENTE: &str = "ID_Cliente";
pub const ID_ARTICULO: &str = "ID_Articulo";
pub const CANTIDAD: &str = "Cantidad";
pub const TOTAL: &str = "Total";
pub const FECHA: &str = "Fecha";
pub const NOMBRE_ARTICULO: &str = "Nombre_Articulo";
pub const STOCK: &str = "Stock";
pub const STOCK_ACTUAL: &str = "Stock_Actual";
pub const FECHA_ULTIMA_REPOSICION: &str = "Fecha_Ultima_Reposicion";
pub const NOMBRE: &str = "Nombre";
pub const APELLIDO: &str = "Apellido";
pub const TIPO_CLIENTE: &str = "Tipo_Cliente";
pub const FECHA_REGISTRO: &str = "Fecha_Registro";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Decimal,
    Date,
}

impl ColumnKind {
    fn cast_target(&self) -> Option<DataType> {
        match self {
            ColumnKind::Integer => Some(DataType::Int64),
            ColumnKind::Decimal => Some(DataType::Float64),
            ColumnKind::Text | ColumnKind::Date => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn required(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

/// A CSV object in the lake and the columns the pipeline relies on.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub file_name: &'static str,
    pub label: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const TICKETS: TableSpec = TableSpec {
    file_name: "tickets.csv",
    label: "Facturas",
    columns: &[
        required(ID_CLIENTE, ColumnKind::Text),
        required(ID_ARTICULO, ColumnKind::Text),
        required(CANTIDAD, ColumnKind::Integer),
        required(TOTAL, ColumnKind::Decimal),
        required(FECHA, ColumnKind::Date),
    ],
};

pub const ITEMS: TableSpec = TableSpec {
    file_name: "items.csv",
    label: "Inventario",
    columns: &[
        required(ID_ARTICULO, ColumnKind::Text),
        required(NOMBRE_ARTICULO, ColumnKind::Text),
        required(STOCK, ColumnKind::Integer),
        required(FECHA_ULTIMA_REPOSICION, ColumnKind::Date),
    ],
};

pub const CLIENTS: TableSpec = TableSpec {
    file_name: "clients.csv",
    label: "Usuarios",
    columns: &[
        required(ID_CLIENTE, ColumnKind::Text),
        required(NOMBRE, ColumnKind::Text),
        required(APELLIDO, ColumnKind::Text),
        required(TIPO_CLIENTE, ColumnKind::Text),
        required(FECHA_REGISTRO, ColumnKind::Date),
    ],
};

pub const VENTAS_POR_CLIENTE: TableSpec = TableSpec {
    file_name: "ventas_por_cliente.csv",
    label: "Total de ventas por cliente",
    columns: &[
        required(ID_CLIENTE, ColumnKind::Text),
        required(TOTAL, ColumnKind::Decimal),
        required(NOMBRE, ColumnKind::Text),
        required(APELLIDO, ColumnKind::Text),
    ],
};

pub const VENTAS_POR_DIA: TableSpec = TableSpec {
    file_name: "ventas_por_dia.csv",
    label: "Ventas por día",
    columns: &[required(FECHA, ColumnKind::Date), required(TOTAL, ColumnKind::Decimal)],
};

impl TableSpec {
    pub fn date_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .filter(|spec| spec.kind == ColumnKind::Date)
            .map(|spec| spec.name)
    }

    /// Checks the required columns exist and strictly casts the numeric ones.
    ///
    /// Date columns stay as text; see [`crate::dates::normalize_dates`].
    pub fn conform(&self, mut df: DataFrame) -> Result<DataFrame> {
        for spec in self.columns {
            let current = df.column(spec.name).map_err(|_| EtlError::MissingColumn {
                table: self.file_name.to_string(),
                column: spec.name.to_string(),
            })?;

            let Some(target) = spec.kind.cast_target() else {
                continue;
            };
            if current.dtype() == &target {
                continue;
            }

            let casted = self.cast_column(spec, current, &target)?;
            df.with_column(casted)?;
        }
        Ok(df)
    }

    /// Integer columns also accept whole-valued decimals such as `2.0`.
    fn cast_column(
        &self,
        spec: &ColumnSpec,
        current: &Column,
        target: &DataType,
    ) -> Result<Column> {
        let direct = match current.strict_cast(target) {
            Ok(casted) => return Ok(casted),
            Err(err) => err,
        };
        if spec.kind != ColumnKind::Integer {
            return Err(direct.into());
        }
        let Ok(decimals) = current.strict_cast(&DataType::Float64) else {
            return Err(direct.into());
        };

        let fractional = decimals
            .f64()?
            .iter()
            .enumerate()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite() || v.fract() != 0.0));
        if let Some((row, value)) = fractional {
            let raw = current
                .str()
                .ok()
                .and_then(|text| text.get(row))
                .map(str::to_string)
                .or_else(|| value.map(|v| v.to_string()))
                .unwrap_or_default();
            return Err(EtlError::NonIntegral {
                table: self.file_name.to_string(),
                column: spec.name.to_string(),
                row,
                value: raw,
            });
        }

        Ok(decimals.strict_cast(target)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn conform_casts_numeric_columns() {
        let df = df![
            ID_ARTICULO => ["I1", "I2"],
            NOMBRE_ARTICULO => ["Mate", "Yerba"],
            STOCK => ["10", "4"],
            FECHA_ULTIMA_REPOSICION => ["2024-01-01", "2024-01-05"],
        ]
        .expect("construct items frame");

        let typed = ITEMS.conform(df).expect("conform items");
        assert_eq!(typed.column(STOCK).unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            typed.column(FECHA_ULTIMA_REPOSICION).unwrap().dtype(),
            &DataType::String
        );
        assert_eq!(typed.column(STOCK).unwrap().i64().unwrap().get(1), Some(4));
    }

    #[test]
    fn conform_reports_missing_column() {
        let df = df![
            ID_CLIENTE => ["C1"],
            NOMBRE => ["Ana"],
        ]
        .expect("construct clients frame");

        let err = CLIENTS.conform(df).unwrap_err();
        assert!(matches!(
            err,
            EtlError::MissingColumn { ref table, ref column }
                if table == "clients.csv" && column == APELLIDO
        ));
    }

    #[test]
    fn conform_rejects_non_numeric_quantity() {
        let df = df![
            ID_CLIENTE => ["C1"],
            ID_ARTICULO => ["I1"],
            CANTIDAD => ["dos"],
            TOTAL => ["20"],
            FECHA => ["2024-01-01"],
        ]
        .expect("construct tickets frame");

        assert!(matches!(TICKETS.conform(df), Err(EtlError::Polars(_))));
    }

    #[test]
    fn conform_accepts_whole_valued_decimals_for_integers() {
        let df = df![
            ID_ARTICULO => ["I1", "I2", "I3"],
            NOMBRE_ARTICULO => ["Mate", "Yerba", "Termo"],
            STOCK => [Some("2.0"), None, Some("7")],
            FECHA_ULTIMA_REPOSICION => ["2024-01-01", "2024-01-05", "2024-01-06"],
        ]
        .expect("construct items frame");

        let typed = ITEMS.conform(df).expect("conform items");
        let stock = typed.column(STOCK).unwrap().i64().unwrap();
        assert_eq!(stock.get(0), Some(2));
        assert_eq!(stock.get(1), None);
        assert_eq!(stock.get(2), Some(7));
    }

    #[test]
    fn conform_rejects_fractional_integers_with_row() {
        let df = df![
            ID_CLIENTE => ["C1", "C1"],
            ID_ARTICULO => ["I1", "I2"],
            CANTIDAD => ["1", "2.5"],
            TOTAL => ["20", "5"],
            FECHA => ["2024-01-01", "2024-01-02"],
        ]
        .expect("construct tickets frame");

        let err = TICKETS.conform(df).unwrap_err();
        assert!(matches!(
            err,
            EtlError::NonIntegral { ref table, ref column, row: 1, ref value }
                if table == "tickets.csv" && column == CANTIDAD && value == "2.5"
        ));
    }

    #[test]
    fn date_columns_follow_declaration_order() {
        assert_eq!(TICKETS.date_columns().collect::<Vec<_>>(), vec![FECHA]);
        assert_eq!(
            CLIENTS.date_columns().collect::<Vec<_>>(),
            vec![FECHA_REGISTRO]
        );
    }
}
