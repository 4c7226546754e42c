//! End-to-end pipeline tests against deterministic stub models.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, ArrayD, IxDyn};
use rand::{Rng, SeedableRng};

use deepstego::image::NormalizationProfile;
use deepstego::{
    Error, HidingPipeline, ImagePairRequest, ImageTextRequest, ModelGateway, ModelTensor,
    ModelType, Result, RevealingPipeline, SingleImageRequest, Steganographer,
    TextDecodingPipeline, TextEncodingPipeline,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn solid(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    png(&RgbImage::from_pixel(width, height, Rgb(color)))
}

fn noise(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    png(&RgbImage::from_fn(width, height, |_, _| {
        Rgb([rng.random(), rng.random(), rng.random()])
    }))
}

fn decode(bytes: &[u8]) -> RgbImage {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .unwrap()
        .to_rgb8()
}

fn assert_close(actual: Rgb<u8>, expected: [u8; 3]) {
    for (a, e) in actual.0.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 1, "{actual:?} vs {expected:?}");
    }
}

fn image_input(inputs: &[ModelTensor], index: usize) -> &ndarray::Array4<f32> {
    match &inputs[index] {
        ModelTensor::Image(image) => image,
        ModelTensor::Text(_) => panic!("input {index} is not an image"),
    }
}

/// Returns the secret (first input) as the stego image.
fn leak_secret(inputs: &[ModelTensor]) -> Result<ArrayD<f32>> {
    Ok(inputs[0].to_dyn())
}

fn echo(inputs: &[ModelTensor]) -> Result<ArrayD<f32>> {
    Ok(inputs[0].to_dyn())
}

/// Writes each code point into the red channel of the first pixel row.
fn text_encoder(inputs: &[ModelTensor]) -> Result<ArrayD<f32>> {
    let mut stego = image_input(inputs, 0).clone();
    let ModelTensor::Text(text) = &inputs[1] else {
        panic!("second input is not text");
    };
    for (i, &code) in text.row(0).iter().enumerate() {
        stego[[0, 0, i, 0]] = code / 255.0;
    }
    Ok(stego.into_dyn())
}

/// Reads code points back from the red channel of the first pixel row.
fn text_decoder(inputs: &[ModelTensor]) -> Result<ArrayD<f32>> {
    let image = image_input(inputs, 0);
    let row = Array2::from_shape_fn((1, 100), |(_, i)| (image[[0, 0, i, 0]] * 255.0).round());
    Ok(row.into_dyn())
}

fn gateway<M: deepstego::Model + 'static>(model_type: ModelType, model: M) -> Arc<ModelGateway> {
    Arc::new(ModelGateway::spawn(model_type, model, TIMEOUT).unwrap())
}

fn steganographer() -> Steganographer {
    let profile = NormalizationProfile::IMAGENET;
    Steganographer::from_pipelines(
        HidingPipeline::new(gateway(ModelType::Hide, leak_secret), profile).unwrap(),
        RevealingPipeline::new(gateway(ModelType::Reveal, echo), profile).unwrap(),
        TextEncodingPipeline::new(gateway(ModelType::TextEncoder, text_encoder)).unwrap(),
        TextDecodingPipeline::new(gateway(ModelType::TextDecoder, text_decoder)).unwrap(),
    )
}

#[test]
fn test_hide_then_reveal_produces_model_sized_images() {
    let service = steganographer();

    let stego = service
        .hide(&ImagePairRequest {
            cover: noise(300, 200, 1),
            secret: noise(100, 100, 2),
        })
        .unwrap();
    let stego_image = decode(&stego.png);
    assert_eq!(stego_image.dimensions(), (224, 224));

    let revealed = service
        .reveal(&SingleImageRequest { image: stego.png })
        .unwrap();
    let revealed_image = decode(&revealed.png);
    assert_eq!(revealed_image.dimensions(), (224, 224));
    assert_eq!(revealed_image.as_raw().len(), 224 * 224 * 3);
}

#[test]
fn test_hide_passes_secret_first() {
    let service = steganographer();

    let stego = service
        .hide(&ImagePairRequest {
            cover: solid(64, 64, [10, 10, 200]),
            secret: solid(64, 64, [200, 10, 10]),
        })
        .unwrap();

    // The stub leaks its first input, which must be the secret.
    assert_close(*decode(&stego.png).get_pixel(112, 112), [200, 10, 10]);
}

#[test]
fn test_hide_normalizes_inputs() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let model = move |inputs: &[ModelTensor]| -> Result<ArrayD<f32>> {
        // A mid-grey pixel normalized with ImageNet statistics.
        let value = image_input(inputs, 1)[[0, 112, 112, 0]];
        let expected = (128.0 / 255.0 - 0.485) / 0.229;
        assert!((value - expected).abs() < 1e-4, "{value} vs {expected}");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(inputs[1].to_dyn())
    };
    let pipeline =
        HidingPipeline::new(gateway(ModelType::Hide, model), NormalizationProfile::IMAGENET)
            .unwrap();

    let stego = pipeline
        .hide(&solid(50, 50, [128, 128, 128]), &solid(50, 50, [0, 0, 0]))
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_close(*decode(&stego).get_pixel(5, 5), [128, 128, 128]);
}

#[test]
fn test_hide_clips_out_of_range_output() {
    let model = |_: &[ModelTensor]| -> Result<ArrayD<f32>> {
        Ok(ArrayD::from_elem(IxDyn(&[1, 224, 224, 3]), 100.0))
    };
    let pipeline =
        HidingPipeline::new(gateway(ModelType::Hide, model), NormalizationProfile::IMAGENET)
            .unwrap();

    let stego = pipeline
        .hide(&solid(10, 10, [0, 0, 0]), &solid(10, 10, [0, 0, 0]))
        .unwrap();

    assert!(decode(&stego).pixels().all(|p| p.0 == [255, 255, 255]));
}

#[test]
fn test_text_round_trip() {
    let service = steganographer();

    let stego = service
        .encode_text(&ImageTextRequest {
            image: noise(300, 200, 3),
            text: "hello".to_string(),
        })
        .unwrap();
    assert_eq!(decode(&stego.png).dimensions(), (224, 224));

    let decoded = service
        .decode_text(&SingleImageRequest { image: stego.png })
        .unwrap();
    assert_eq!(decoded.text, "hello");
}

#[test]
fn test_text_round_trip_strips_surrounding_spaces() {
    let service = steganographer();

    let stego = service
        .encode_text(&ImageTextRequest {
            image: noise(64, 64, 4),
            text: "  hi  ".to_string(),
        })
        .unwrap();
    let decoded = service
        .decode_text(&SingleImageRequest { image: stego.png })
        .unwrap();

    // Known loss: payload spaces at either end are stripped with the padding.
    assert_eq!(decoded.text, "hi");
}

#[test]
fn test_text_pipeline_skips_normalization() {
    let pipeline = TextEncodingPipeline::new(gateway(ModelType::TextEncoder, echo)).unwrap();

    let stego = pipeline
        .encode_text_into_image(&solid(224, 224, [10, 20, 30]), "abc")
        .unwrap();

    assert_eq!(decode(&stego).get_pixel(100, 100).0, [10, 20, 30]);
}

#[test]
fn test_overlong_text_is_rejected_before_inference() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let model = move |inputs: &[ModelTensor]| {
        counter.fetch_add(1, Ordering::SeqCst);
        echo(inputs)
    };
    let pipeline = TextEncodingPipeline::new(gateway(ModelType::TextEncoder, model)).unwrap();

    let err = pipeline
        .encode_text_into_image(&solid(8, 8, [0, 0, 0]), &"a".repeat(101))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::TextLength {
            length: 101,
            capacity: 100
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_decoder_garbage_is_rejected() {
    let model = |_: &[ModelTensor]| -> Result<ArrayD<f32>> {
        Ok(ArrayD::from_elem(IxDyn(&[1, 100]), -42.0))
    };
    let pipeline = TextDecodingPipeline::new(gateway(ModelType::TextDecoder, model)).unwrap();

    let err = pipeline
        .decode_text_from_image(&solid(8, 8, [0, 0, 0]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCodePoint { position: 0, .. }));
}

#[test]
fn test_decoder_reads_first_row_only() {
    let model = |_: &[ModelTensor]| -> Result<ArrayD<f32>> {
        let mut rows = ArrayD::from_elem(IxDyn(&[2, 100]), 32.0);
        rows[[0, 0]] = 111.0;
        rows[[0, 1]] = 107.0;
        rows[[1, 0]] = 120.0;
        Ok(rows)
    };
    let pipeline = TextDecodingPipeline::new(gateway(ModelType::TextDecoder, model)).unwrap();

    let text = pipeline
        .decode_text_from_image(&solid(8, 8, [0, 0, 0]))
        .unwrap();
    assert_eq!(text, "ok");
}

#[test]
fn test_corrupt_image_is_rejected() {
    let service = steganographer();

    let err = service
        .reveal(&SingleImageRequest {
            image: b"\x89PNG but not really".to_vec(),
        })
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));

    let err = service
        .hide(&ImagePairRequest {
            cover: solid(8, 8, [0, 0, 0]),
            secret: Vec::new(),
        })
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_pipeline_requires_matching_model() {
    let reveal = gateway(ModelType::Reveal, echo);

    let err = HidingPipeline::new(reveal, NormalizationProfile::IMAGENET).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }));
}

#[test]
fn test_concurrent_inference_is_not_mixed_up() {
    // Keeps the last input in shared scratch space, like a runtime that is
    // not safe to enter from two threads at once.
    let mut scratch = ArrayD::<f32>::zeros(IxDyn(&[1, 224, 224, 3]));
    let model = move |inputs: &[ModelTensor]| -> Result<ArrayD<f32>> {
        scratch.assign(&inputs[0].to_dyn());
        thread::sleep(Duration::from_millis(2));
        Ok(scratch.clone())
    };
    let gateway = gateway(ModelType::Reveal, model);

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                let value = f32::from(i) / 10.0;
                for _ in 0..5 {
                    let input = ndarray::Array4::from_elem((1, 224, 224, 3), value);
                    let output = gateway.infer(vec![ModelTensor::Image(input)]).unwrap();
                    assert!(output.iter().all(|&v| (v - value).abs() < f32::EPSILON));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_requests_share_one_service() {
    let service = Arc::new(steganographer());

    let handles: Vec<_> = (0..6u8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let color = [i * 40, 255 - i * 40, 17];
                let revealed = service
                    .reveal(&SingleImageRequest {
                        image: solid(32, 32, color),
                    })
                    .unwrap();
                assert_close(*decode(&revealed.png).get_pixel(112, 112), color);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
