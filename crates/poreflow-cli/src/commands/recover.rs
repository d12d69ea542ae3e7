use super::log_network_report;
use crate::cli::RecoverArgs;
use crate::error::{CliError, Result};
use poreflow::core::io::network_file::{NetworkFile, RawNetworkLayout, read_or_recover_path};
use poreflow::core::io::traits::RecordFile;
use tracing::info;

pub async fn run(args: RecoverArgs) -> Result<()> {
    if !(args.pixel_size.is_finite() && args.pixel_size > 0.0) {
        return Err(CliError::Config(format!(
            "Pixel size must be positive, got {}",
            args.pixel_size
        )));
    }
    let layout = RawNetworkLayout {
        pore_count: args.pores,
        throat_count: args.throats,
        pixel_size: args.pixel_size,
    };

    info!("Recovering pore network from {:?}", &args.raw);
    let (network, report) =
        read_or_recover_path(&args.raw, layout).map_err(|e| CliError::FileParsing {
            path: args.raw.clone(),
            source: e.into(),
        })?;
    log_network_report(&report);

    NetworkFile::write_to_path(&network, &args.output).map_err(|e| CliError::FileWriting {
        path: args.output.clone(),
        source: e.into(),
    })?;

    println!(
        "✓ Recovered {} of {} pores and {} of {} throats into: {}",
        report.pores_read,
        report.declared_pores,
        network.throats().len(),
        report.declared_throats,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use poreflow::core::models::ids::{PoreId, ThroatId};
    use poreflow::core::models::network::PoreNetworkModelBuilder;
    use poreflow::core::models::pore::{Pore, Throat};

    const HEADER_LEN: usize = 8 + 12 + 24;

    #[tokio::test]
    async fn headerless_records_are_rebuilt_into_a_network_file() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.pixel_size(2e-6).porosity(0.2).tortuosity(1.3);
        for i in 0..3 {
            builder
                .add_pore(Pore::new(
                    PoreId(i),
                    Point3::new(i as f64 * 1e-5, 0.0, 0.0),
                    1e-6,
                    4e-18,
                    1e-11,
                ))
                .unwrap();
        }
        for (t, (a, b)) in [(0, 1), (1, 2)].into_iter().enumerate() {
            builder
                .add_throat(Throat::new(
                    ThroatId(t as i32),
                    PoreId(a),
                    PoreId(b),
                    5e-7,
                    1e-5,
                    8e-18,
                ))
                .unwrap();
        }
        let original = builder.build().unwrap();

        let mut bytes = Vec::new();
        NetworkFile::write_to(&original, &mut bytes).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("dump.bin");
        std::fs::write(&raw, &bytes[HEADER_LEN..]).unwrap();
        let output = dir.path().join("recovered.pnm");

        run(RecoverArgs {
            raw,
            output: output.clone(),
            pores: 3,
            throats: 2,
            pixel_size: 2e-6,
        })
        .await
        .unwrap();

        let (recovered, report) = NetworkFile::read_from_path(&output).unwrap();
        assert!(report.is_clean());
        assert_eq!(recovered.pores(), original.pores());
        assert_eq!(recovered.throats(), original.throats());
        assert_eq!(recovered.pixel_size(), 2e-6);
        assert_eq!(recovered.tortuosity(), 1.0);
    }

    #[tokio::test]
    async fn non_positive_pixel_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(RecoverArgs {
            raw: dir.path().join("dump.bin"),
            output: dir.path().join("out.pnm"),
            pores: 1,
            throats: 0,
            pixel_size: 0.0,
        })
        .await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
