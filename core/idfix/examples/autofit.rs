//! Run the auto-fit pipeline on a photo with a saved validation report.
//!
//! Usage:
//!   cargo run --example autofit -- <photo> <report.json> [xmin,ymin,w,h[,conf]] [subject.png]
//!
//! Writes `output.jpg` and `response.json` to the current directory.
//! Set `RUST_LOG=idfix=debug` to see the placement events.

use idfix::{FixedDetections, PhotoPipeline, PrecomputedSubject, RelativeBox, ValidationReport};
use tracing_subscriber::EnvFilter;

fn parse_face_box(arg: &str) -> FixedDetections {
    let values: Vec<f64> = arg
        .split(',')
        .map(|v| v.trim().parse().expect("face box values must be numbers"))
        .collect();
    assert!(
        values.len() == 4 || values.len() == 5,
        "face box is xmin,ymin,width,height[,confidence]"
    );
    let bbox = RelativeBox {
        xmin: values[0],
        ymin: values[1],
        width: values[2],
        height: values[3],
    };
    FixedDetections::single(bbox, values.get(4).copied().unwrap_or(1.0))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: autofit <photo> <report.json> [xmin,ymin,w,h[,conf]] [subject.png]");
        std::process::exit(2);
    }

    let input = std::fs::read(&args[0]).expect("failed to read photo");
    let report_text = std::fs::read_to_string(&args[1]).expect("failed to read report");
    let report = ValidationReport::from_model_text(&report_text).expect("invalid report");

    let mut pipeline = PhotoPipeline::new(input).expect("failed to decode photo");
    if let Some(face) = args.get(2) {
        pipeline = pipeline.face_locator(Box::new(parse_face_box(face)));
    }
    if let Some(path) = args.get(3) {
        let png = std::fs::read(path).expect("failed to read subject");
        let subject = PrecomputedSubject::from_encoded(&png).expect("failed to decode subject");
        pipeline = pipeline.subject_extractor(Box::new(subject));
    }

    let outcome = pipeline.process_with_report(report).expect("pipeline failed");

    println!("decision: {:?}", outcome.decision);
    for issue in &outcome.fatal_issues {
        println!("  fatal   {}: {}", issue.key, issue.message);
    }
    for issue in &outcome.warnings {
        println!("  warning {}: {}", issue.key, issue.message);
    }
    for step in &outcome.processing_applied {
        println!("  - {step}");
    }

    if let Some(photo) = &outcome.output {
        std::fs::write("output.jpg", &photo.data).unwrap();
        let t = photo.placement.transform;
        println!(
            "output.jpg: {}x{} scale={:.3} offset=({}, {}) branch={:?}",
            photo.width, photo.height, t.scale, t.offset_x, t.offset_y, photo.placement.branch
        );
    }

    let json = outcome.to_response().to_json().unwrap();
    std::fs::write("response.json", json).unwrap();
    println!("response.json written (http status {})", outcome.http_status());
}
