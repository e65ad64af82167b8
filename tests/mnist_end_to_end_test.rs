//! Train a network on a tiny synthetic MNIST-format dataset, then feed one of
//! the trained images back through the classifier and expect the right digit.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use env_logger::{Builder, Env};

use netforge::mnist::{
    DigitClassificationInput, DigitClassifier, MnistNetworkFactory, HEIGHT, MNIST_DATA_SHAPE, WIDTH,
};
use netforge::net::{LocalFileNetworkStore, NetworkLoader, NetworkSerializer, SavedNetworkRunner};
use netforge::NeuralError;

const TEST_NETWORK_ID: &str = "test-network-id";

fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

/// Each digit lights its own pair of rows, so the ten images share no pixels.
fn digit_pixels(digit: usize) -> Vec<Vec<f64>> {
    let mut pixels = vec![vec![0.0; WIDTH]; HEIGHT];
    for row in [2 * digit + 4, 2 * digit + 5] {
        for (w, pixel) in pixels[row].iter_mut().enumerate() {
            *pixel = if w % 7 == 0 { 128.0 } else { 255.0 };
        }
    }
    pixels
}

fn write_csv(path: &Path) -> std::io::Result<()> {
    let mut csv = String::from("label");
    for h in 0..HEIGHT {
        for w in 0..WIDTH {
            let _ = write!(csv, ",{}x{}", h + 1, w + 1);
        }
    }
    csv.push('\n');
    for digit in 0..10 {
        let _ = write!(csv, "{}", digit);
        for row in digit_pixels(digit) {
            for pixel in row {
                let _ = write!(csv, ",{}", pixel as u8);
            }
        }
        csv.push('\n');
    }
    fs::write(path, csv)
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<LocalFileNetworkStore>,
    train_csv: PathBuf,
    test_csv: PathBuf,
}

fn fixture() -> Result<Fixture, NeuralError> {
    init();
    let dir = tempfile::tempdir()?;
    let store = Arc::new(LocalFileNetworkStore::new(dir.path().join("networks"))?);
    let train_csv = dir.path().join("mnist-ten-rows-train.csv");
    let test_csv = dir.path().join("mnist-ten-rows-test.csv");
    write_csv(&train_csv)?;
    write_csv(&test_csv)?;
    Ok(Fixture {
        _dir: dir,
        store,
        train_csv,
        test_csv,
    })
}

#[test]
fn test_correct_classifications() -> Result<(), NeuralError> {
    let fixture = fixture()?;
    let factory = MnistNetworkFactory::new(fixture.store.clone(), fixture.store.clone());
    factory.create_network(
        TEST_NETWORK_ID,
        Duration::from_secs(2),
        &fixture.train_csv,
        &fixture.test_csv,
    )?;

    // Verify created network
    let saved = fixture.store.load(TEST_NETWORK_ID)?.expect("network was saved");
    assert_eq!(saved.id, TEST_NETWORK_ID);
    assert!(!saved.network_binary_base64.is_empty());
    assert_eq!(saved.data_shape, MNIST_DATA_SHAPE);
    assert_eq!(saved.data_shape.num_dimensions, 3);
    assert_eq!(saved.data_shape.num_labels, 10);
    assert_eq!(saved.data_shape.height, 28);
    assert_eq!(saved.data_shape.length, 28);
    assert_eq!(saved.data_shape.depth, 1);

    let runner = Arc::new(SavedNetworkRunner::new(fixture.store.clone()));
    let classifier = DigitClassifier::new(TEST_NETWORK_ID, runner);
    classifier.warm_up()?;

    for digit in [5, 1] {
        let input = DigitClassificationInput::new(digit_pixels(digit));
        let output = classifier.classify_digit(Some(&input))?;
        assert_eq!(output.label_index(), digit);
        assert!(
            output.label_probabilities()[digit] > 0.5,
            "p({}) = {}",
            digit,
            output.label_probabilities()[digit]
        );
    }
    Ok(())
}

#[test]
fn test_existing_network_is_trained_further() -> Result<(), NeuralError> {
    let fixture = fixture()?;
    let factory = MnistNetworkFactory::new(fixture.store.clone(), fixture.store.clone());
    factory.create_network(
        TEST_NETWORK_ID,
        Duration::from_millis(300),
        &fixture.train_csv,
        &fixture.test_csv,
    )?;
    let serializer = NetworkSerializer::new();
    let first = fixture.store.load(TEST_NETWORK_ID)?.expect("network was saved");
    let first = serializer.deserialize(&first.network_binary_base64)?;

    // No time at all: the saved network is the starting point and the result.
    let result = factory.create_network(
        TEST_NETWORK_ID,
        Duration::ZERO,
        &fixture.train_csv,
        &fixture.test_csv,
    )?;
    assert_eq!(result.total_epochs, 0);
    assert_eq!(result.best_model, first);
    Ok(())
}

#[test]
fn test_invalid_inputs() -> Result<(), NeuralError> {
    let fixture = fixture()?;
    let runner = Arc::new(SavedNetworkRunner::new(fixture.store.clone()));
    let classifier = DigitClassifier::new(TEST_NETWORK_ID, runner);

    let cases = [
        (None, "Required request body is missing"),
        (Some(DigitClassificationInput::default()), "Null input"),
        (
            Some(DigitClassificationInput::new(vec![vec![0.0; 27]; 28])),
            "Invalid length at row 0 should be 28 but got 27",
        ),
        (
            Some(DigitClassificationInput::new(vec![vec![0.0; 28]; 27])),
            "Height must be 28 but got 27",
        ),
    ];
    for (input, message) in cases {
        let err = classifier.classify_digit(input.as_ref()).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), message);
    }

    // Valid input, nothing trained yet
    let err = classifier
        .classify_digit(Some(&DigitClassificationInput::blank()))
        .unwrap_err();
    assert_eq!(err.to_string(), "No network found for id 'test-network-id'");
    Ok(())
}
