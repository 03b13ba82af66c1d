//! Cloud screening demo: EM clustering of synthetic multi-band pixels
//!
//! Generates 3000 pixels with four features (blue, red, NIR reflectance and
//! a brightness index) drawn around four surface types:
//!   - cloud       (bright in every band)
//!   - water       (dark, NIR lowest)
//!   - vegetation  (red-edge jump into NIR)
//!   - bare soil   (slowly rising spectrum)
//!
//! Then:
//!   1. fits K = 5 clusters by EM
//!   2. labels the cloud clusters by mean brightness
//!   3. computes cloud probabilities restricted to the cloud clusters
//!   4. averages the spectra of the surface clusters (endmembers)
//!
//! Run:
//!   cargo run -p emclust-algorithms --example cloud_screening_demo

use std::ops::ControlFlow;

use emclust_algorithms::prelude::*;

const PIXELS: usize = 3000;

/// (blue, red, nir) centers per surface type
const SURFACES: [(&str, [f64; 3]); 4] = [
    ("cloud", [0.62, 0.60, 0.58]),
    ("water", [0.08, 0.05, 0.02]),
    ("vegetation", [0.04, 0.06, 0.42]),
    ("soil", [0.12, 0.22, 0.30]),
];

const BRIGHTNESS_THRESHOLD: f64 = 0.4;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // --- 1. Synthetic pixels ---
    let (features, spectra) = build_pixels()?;
    println!(
        "Synthetic scene: {} pixels, {} features",
        features.len(),
        features.dimension()
    );

    // --- 2. Fit ---
    let params = EmParams {
        cluster_count: 5,
        iteration_count: 25,
        seed: 31415,
    };
    let model = find_clusters_with(&features, &params, ClusterOrder::default(), |done| {
        if done % 5 == 0 {
            println!("  iteration {}/{}", done, params.iteration_count);
        }
        ControlFlow::Continue(())
    })?;

    println!("\nClusters (largest prior first):");
    let mut cloud_flags = Vec::with_capacity(model.cluster_count());
    for (k, cluster) in model.clusters().iter().enumerate() {
        let mean = cluster.mean();
        let brightness = mean[3];
        let is_cloud = brightness > BRIGHTNESS_THRESHOLD;
        cloud_flags.push(is_cloud);
        println!(
            "  #{:<2} prior {:.3}  mean [{:.3}, {:.3}, {:.3}, {:.3}]{}",
            k,
            cluster.prior_probability(),
            mean[0],
            mean[1],
            mean[2],
            mean[3],
            if is_cloud { "  <- cloud" } else { "" }
        );
    }

    // --- 3. Cloud probability ---
    let cloud = Inclusive::new(cloud_flags.clone());
    let table = model.posterior_table(&features, &AcceptAll)?;
    let cloud_probability: Vec<f64> = table
        .rows()
        .into_iter()
        .map(|h| h.iter().enumerate().filter(|(k, _)| cloud.accept(*k)).map(|(_, p)| p).sum())
        .collect();
    let cloudy = cloud_probability.iter().filter(|&&p| p > 0.5).count();
    println!(
        "\nPixels with cloud probability > 0.5: {} of {} ({:.1}%)",
        cloudy,
        PIXELS,
        100.0 * cloudy as f64 / PIXELS as f64
    );

    let labels = model.classify(&features, &AcceptAll)?;
    let mut counts = vec![0usize; model.cluster_count()];
    for k in labels.into_iter().flatten() {
        counts[k] += 1;
    }
    println!("Hard label counts: {:?}", counts);

    // --- 4. Surface endmembers ---
    let surface = Exclusive::new([cloud_flags]);
    let endmembers = average_members(&model, &features, &spectra, &AcceptAll, &surface, 0.5)?;
    println!("\nSurface endmembers (blue, red, nir):");
    for (k, endmember) in endmembers.iter().enumerate() {
        match endmember {
            Some(e) => println!("  #{:<2} [{:.3}, {:.3}, {:.3}]", k, e[0], e[1], e[2]),
            None => println!("  #{:<2} -", k),
        }
    }

    Ok(())
}

/// Returns (features, spectra): features add a brightness index to the spectrum.
fn build_pixels() -> anyhow::Result<(PointTable, PointTable)> {
    let mut features = Vec::with_capacity(PIXELS * 4);
    let mut spectra = Vec::with_capacity(PIXELS * 3);

    for i in 0..PIXELS {
        let (_, center) = SURFACES[i % SURFACES.len()];
        let t = i as f64;
        let noise = [
            (t * 0.917).sin() * 0.015,
            (t * 1.303).cos() * 0.015,
            (t * 0.411).sin() * (t * 2.71).cos() * 0.02,
        ];
        let band: Vec<f64> = center.iter().zip(noise).map(|(c, n)| c + n).collect();
        let brightness = band.iter().sum::<f64>() / 3.0 + (t * 0.173).cos() * 0.005;

        features.extend_from_slice(&band);
        features.push(brightness);
        spectra.extend_from_slice(&band);
    }

    Ok((
        PointTable::from_vec(features, PIXELS, 4)?,
        PointTable::from_vec(spectra, PIXELS, 3)?,
    ))
}
