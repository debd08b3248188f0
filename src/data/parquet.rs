//! Parquet file handling for attributed graph datasets

use std::path::Path;
use ndarray::Array2;
use polars::prelude::*;
use crate::error::{Error, Result};
use crate::graph::{AttributedGraph, GraphBuilder};

/// Sparse adjacency in coordinate form: columns `row`, `col`, optional `value`
pub const NETWORK_FILE: &str = "network.parquet";

/// Ground truth, column `label` (1 anomalous, 0 normal)
pub const LABEL_FILE: &str = "label.parquet";

/// Node attribute matrix, one numeric column per attribute
pub const ATTRIBUTES_FILE: &str = "attributes.parquet";

fn read_parquet(path: &Path) -> Result<DataFrame> {
    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::debug!("{}: {} rows, schema {:?}", path.display(), df.height(), df.schema());
    Ok(df)
}

fn read_optional(path: &Path) -> Result<Option<DataFrame>> {
    if path.exists() {
        read_parquet(path).map(Some)
    } else {
        log::debug!("No {} found, skipping", path.display());
        Ok(None)
    }
}

fn to_index(value: i64, column: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidParameter {
        name: column,
        message: format!("node index {} is not a valid node id", value),
    })
}

/// Edge list read from the network file
struct CooEdges {
    edges: Vec<(u32, u32, f64)>,
    max_index: Option<u32>,
}

fn read_network(df: &DataFrame) -> Result<CooEdges> {
    let rows = df.column("row")?.cast(&DataType::Int64)?;
    let cols = df.column("col")?.cast(&DataType::Int64)?;
    let values = match df.column("value") {
        Ok(column) => Some(column.cast(&DataType::Float64)?),
        Err(_) => None,
    };

    let rows = rows.i64()?;
    let cols = cols.i64()?;
    let values = values.as_ref().map(|v| v.f64()).transpose()?;

    let mut edges = Vec::with_capacity(df.height());
    let mut max_index: Option<u32> = None;
    let mut skipped = 0usize;

    for i in 0..df.height() {
        let (Some(row), Some(col)) = (rows.get(i), cols.get(i)) else {
            skipped += 1;
            continue;
        };
        let weight = match values {
            Some(values) => values.get(i).unwrap_or(0.0),
            None => 1.0,
        };
        if weight == 0.0 {
            skipped += 1;
            continue;
        }

        let a = to_index(row, "row")?;
        let b = to_index(col, "col")?;
        max_index = max_index.max(Some(a.max(b)));
        edges.push((a, b, weight));
    }

    if skipped > 0 {
        log::debug!("Skipped {} null or zero entries", skipped);
    }

    Ok(CooEdges { edges, max_index })
}

fn read_labels(df: &DataFrame) -> Result<Vec<u8>> {
    let labels = df.column("label")?.cast(&DataType::Int64)?;
    let labels = labels.i64()?;
    Ok(labels.into_iter().map(|l| u8::from(l.unwrap_or(0) != 0)).collect())
}

fn read_attributes(df: &DataFrame) -> Result<Array2<f64>> {
    let mut attributes = Array2::<f64>::zeros((df.height(), df.width()));

    for (j, column) in df.get_columns().iter().enumerate() {
        let column = column.cast(&DataType::Float64)?;
        for (i, value) in column.f64()?.into_iter().enumerate() {
            attributes[[i, j]] = value.unwrap_or(0.0);
        }
    }

    Ok(attributes)
}

/// Load a dataset directory into an attributed graph.
///
/// `network.parquet` is required. Labels and attributes are attached when
/// their files exist. The node count covers every edge endpoint and every
/// label or attribute row, so nodes without edges are kept.
pub fn load_dataset(dir: impl AsRef<Path>) -> Result<AttributedGraph> {
    let dir = dir.as_ref();
    let network_path = dir.join(NETWORK_FILE);

    log::info!("Reading dataset from {}", dir.display());

    if !network_path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", network_path.display()),
        )));
    }

    let network = read_network(&read_parquet(&network_path)?)?;
    let labels = read_optional(&dir.join(LABEL_FILE))?
        .map(|df| read_labels(&df))
        .transpose()?;
    let attributes = read_optional(&dir.join(ATTRIBUTES_FILE))?
        .map(|df| read_attributes(&df))
        .transpose()?;

    let node_count = [
        network.max_index.map_or(0, |m| m as usize + 1),
        labels.as_ref().map_or(0, Vec::len),
        attributes.as_ref().map_or(0, |a| a.nrows()),
    ]
    .into_iter()
    .max()
    .unwrap_or(0);

    log::info!(
        "Building graph with {} nodes from {} adjacency entries",
        node_count,
        network.edges.len()
    );

    let mut builder = GraphBuilder::with_nodes(node_count);
    for &(a, b, weight) in &network.edges {
        builder.add_edge(a, b, weight)?;
    }

    // Short label or attribute tables are padded to the node count
    if let Some(mut labels) = labels {
        labels.resize(node_count, 0);
        builder = builder.with_labels(labels);
    }
    if let Some(attributes) = attributes {
        builder = builder.with_attributes(pad_rows(attributes, node_count));
    }

    let graph = builder.build()?;
    log::info!("Loaded graph with {} nodes and {} edges", graph.node_count, graph.edge_count());

    Ok(graph)
}

fn pad_rows(attributes: Array2<f64>, rows: usize) -> Array2<f64> {
    if attributes.nrows() == rows {
        return attributes;
    }
    let mut padded = Array2::<f64>::zeros((rows, attributes.ncols()));
    padded
        .slice_mut(ndarray::s![..attributes.nrows(), ..])
        .assign(&attributes);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, mut df: DataFrame) {
        let file = File::create(dir.join(name)).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();
    }

    #[test]
    fn test_load_symmetric_coo() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            NETWORK_FILE,
            df!(
                "row" => &[0i64, 1, 1, 2, 0],
                "col" => &[1i64, 0, 2, 1, 2],
                "value" => &[1.0f64, 1.0, 2.0, 2.0, 0.0]
            )
            .unwrap(),
        );
        write(dir.path(), LABEL_FILE, df!("label" => &[0i64, 1, 0, 0]).unwrap());

        let graph = load_dataset(dir.path()).unwrap();

        assert_eq!(graph.node_count, 4);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge(1, 2));
        // Zero entries are not edges
        assert!(!graph.has_edge(0, 2));
        assert_eq!(graph.anomalous_nodes(), vec![1]);
        assert_eq!(graph.degree(3), 0);
    }

    #[test]
    fn test_load_attributes_without_values() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            NETWORK_FILE,
            df!("row" => &[0i32, 1], "col" => &[1i32, 0]).unwrap(),
        );
        write(
            dir.path(),
            ATTRIBUTES_FILE,
            df!("a" => &[1.0f64, 2.0, 3.0], "b" => &[4i64, 5, 6]).unwrap(),
        );

        let graph = load_dataset(dir.path()).unwrap();

        assert_eq!(graph.node_count, 3);
        assert!(!graph.has_labels());
        let row = graph.attributes(2).unwrap();
        assert_eq!(row.to_vec(), vec![3.0, 6.0]);
        assert_eq!(graph.edge_attribute("weight").unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn test_missing_network_names_path() {
        let dir = TempDir::new().unwrap();
        let err = load_dataset(dir.path()).unwrap_err();
        assert!(err.to_string().contains(NETWORK_FILE));
    }

    #[test]
    fn test_negative_index_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            NETWORK_FILE,
            df!("row" => &[-1i64], "col" => &[0i64]).unwrap(),
        );
        assert!(matches!(
            load_dataset(dir.path()),
            Err(Error::InvalidParameter { name: "row", .. })
        ));
    }
}
