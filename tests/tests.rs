use assert_approx_eq::assert_approx_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flatprop::network::{self, LayerState};
use flatprop::train::{
    self, Backpropagation, GradientCalculator, GradientWorker, JacobianChainRule,
    LevenbergMarquardt, Propagation, ResilientPropagation, RpropVariant, StopCondition, Train,
};
use flatprop::{Activation, BasicDataSet, DataSet, ErrorCalculation, FlatLayer, FlatNetwork};

static XOR: [([f64; 2], [f64; 1]); 4] = [
    ([0.0, 0.0], [0.0]),
    ([0.0, 1.0], [1.0]),
    ([1.0, 0.0], [1.0]),
    ([1.0, 1.0], [0.0]),
];

fn xor_network(seed: u64) -> FlatNetwork {
    let mut network =
        FlatNetwork::with_hidden(2, &[4], 1, Activation::Tanh, Activation::Sigmoid).unwrap();
    network.nguyen_widrow(&mut StdRng::seed_from_u64(seed));
    network
}

fn random_data(len: usize, inputs: usize, outputs: usize, seed: u64) -> BasicDataSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = BasicDataSet::new(inputs, outputs);
    for _ in 0..len {
        let input = (0..inputs)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect::<Vec<f64>>();
        let ideal = (0..outputs).map(|_| rng.gen()).collect::<Vec<f64>>();
        data.push(&input, &ideal).unwrap();
    }
    data
}

#[test]
fn test_layout() {
    let network = FlatNetwork::new(&[
        FlatLayer::new(Activation::Linear, 3).with_bias(1.0),
        FlatLayer::new(Activation::Tanh, 5).with_bias(1.0),
        FlatLayer::new(Activation::Sigmoid, 2),
    ])
    .unwrap();

    assert_eq!(&[4, 6, 2], network.layer_counts());
    assert_eq!(&[3, 5, 2], network.layer_feed_counts());
    assert_eq!(&[0, 4, 10], network.layer_index());
    assert_eq!(&[0, 0, 20], network.weight_index());
    assert_eq!(12, network.neuron_count());

    let expected = network
        .layer_feed_counts()
        .iter()
        .skip(1)
        .zip(network.layer_counts())
        .map(|(to, from)| to * from)
        .sum::<usize>();
    assert_eq!(expected, network.weights().len());

    assert_eq!(
        Err(network::Error::OutputBias),
        FlatNetwork::new(&[
            FlatLayer::new(Activation::Linear, 1),
            FlatLayer::new(Activation::Linear, 1).with_bias(1.0),
        ])
    );
}

#[test]
fn test_shared_forward_pass_matches_evaluate() {
    let mut network = xor_network(1);
    let mut state = LayerState::new(&network);

    for (input, _) in &XOR {
        network.compute_with(input, &mut state).unwrap();
        let shared = network.output_of(&state).to_vec();
        assert_eq!(shared.as_slice(), network.evaluate(input).unwrap());
    }
}

#[test]
fn test_error_calculation() {
    let mut errors = ErrorCalculation::new();
    assert_eq!(Err(network::Error::NoSamples), errors.calculate());

    errors.update_error(&[0.5, 1.0], &[1.0, 1.0]);
    errors.update_error(&[0.0, 0.0], &[0.0, 1.0]);
    assert_approx_eq!(1.25, errors.sum_squares());
    assert_eq!(4, errors.count());
    assert_approx_eq!((1.25f64 / 4.0).sqrt(), errors.calculate().unwrap());
}

#[test]
fn test_parallel_gradients_match_single_worker() {
    let data = random_data(101, 4, 3, 7);
    let mut network = FlatNetwork::with_hidden(
        4,
        &[6, 5],
        3,
        Activation::Tanh,
        Activation::Sigmoid,
    )
    .unwrap();
    network.randomize(&mut StdRng::seed_from_u64(8), -0.5, 0.5);

    let mut single = GradientWorker::new(&network, 0..data.len(), false);
    single.run(&network, &data).unwrap();

    let mut calculator = GradientCalculator::new(&network, &data, 0, false).unwrap();
    let error = calculator.run_epoch(&network, &data).unwrap();

    assert_approx_eq!(single.errors().calculate().unwrap(), error, 1e-12);
    for (a, b) in single.gradients().iter().zip(calculator.gradients()) {
        assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
    }

    // The epoch error is the RMS error of the network over the data set
    assert_approx_eq!(network.calculate_error(&data).unwrap(), error, 1e-12);
}

#[test]
fn test_jacobian_row_sums_give_gradient() {
    let network = xor_network(3);
    let weights = network.weights().to_vec();
    let mut jacobian_network = network.clone();

    let mut chain = JacobianChainRule::new(&network, &XOR[..]).unwrap();
    chain
        .calculate(&mut jacobian_network, &XOR[..], &weights)
        .unwrap();

    let mut worker = GradientWorker::new(&network, 0..XOR.len(), false);
    worker.run(&network, &XOR[..]).unwrap();

    // Summing each Jacobian column weighted by the residuals is the descent gradient
    for (i, &gradient) in worker.gradients().iter().enumerate() {
        let sum = chain
            .jacobian()
            .iter()
            .zip(chain.row_errors())
            .map(|(row, e)| row[i] * e)
            .sum::<f64>();
        assert_approx_eq!(gradient, sum, 1e-12);
    }
}

#[test]
fn test_rprop_trains_xor() {
    let network = xor_network(5);
    let initial = network.clone().calculate_error(&XOR[..]).unwrap();

    let rule = ResilientPropagation::new(RpropVariant::Plus);
    let mut trainer = Propagation::new(network, &XOR[..], rule)
        .unwrap()
        .worker_count(2);
    let error = train::train(&mut trainer, StopCondition::Iterations(300)).unwrap();

    assert_eq!(300, trainer.iterations());
    assert!(error < initial);
}

#[test]
fn test_backpropagation_trains() {
    let data = random_data(40, 2, 1, 11);
    let network = FlatNetwork::with_hidden(2, &[3], 1, Activation::Sigmoid, Activation::Linear)
        .unwrap();

    let mut trainer = Propagation::new(network, &data, Backpropagation::new(0.01, 0.5))
        .unwrap()
        .fix_flat_spot(true);
    let first = trainer.iteration().unwrap();
    train::train(&mut trainer, StopCondition::Iterations(100)).unwrap();

    assert!(trainer.error() < first);
}

#[test]
fn test_levenberg_marquardt_trains_xor() {
    let network = xor_network(9);
    let initial = network.clone().calculate_error(&XOR[..]).unwrap();

    let mut trainer = LevenbergMarquardt::new(network, &XOR[..]).unwrap();
    let error = train::train(&mut trainer, StopCondition::Iterations(50)).unwrap();

    assert!(error < initial);
    let mut network = trainer.into_network();
    assert_approx_eq!(error, network.calculate_error(&XOR[..]).unwrap(), 1e-9);
}

#[test]
fn test_trainers_reject_mismatched_data() {
    let data = random_data(4, 3, 1, 0);

    assert_eq!(
        train::Error::InputSizeMismatch(2, 3),
        LevenbergMarquardt::new(xor_network(0), &data).unwrap_err()
    );

    let empty = BasicDataSet::new(2, 1);
    assert!(empty.is_empty());
    assert_eq!(
        train::Error::EmptyTrainingSet,
        Propagation::new(xor_network(0), &empty, Backpropagation::new(0.1, 0.0)).unwrap_err()
    );
}

#[cfg(feature = "serde")]
#[test]
fn test_trained_network_serializes() {
    let mut trainer = LevenbergMarquardt::new(xor_network(2), &XOR[..]).unwrap();
    train::train(&mut trainer, StopCondition::Iterations(5)).unwrap();
    let mut network = trainer.into_network();

    let json = serde_json::to_string(&network).unwrap();
    let mut loaded: FlatNetwork = serde_json::from_str(&json).unwrap();

    for (input, _) in &XOR {
        let expected = network.evaluate(input).unwrap()[0];
        assert_approx_eq!(expected, loaded.evaluate(input).unwrap()[0], 1e-12);
    }
}
