use eagerport_harness::{DType, ModelTest};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

proptest! {
    #![proptest_config(ProptestConfig {
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn shape_round_trips(dims in proptest::collection::vec(0usize..6, 0..5)) {
        let mut m = ModelTest::new();
        m.add_tensors(2, &[0], &[1], DType::F32, &[1]).expect("declare tensors");
        m.set_shape(0, &dims).expect("resize tensor");

        prop_assert_eq!(m.get_shape(0).expect("read shape"), dims.clone());
        let byte_len = m.interpreter().tensor(0).expect("tensor 0").byte_len();
        prop_assert_eq!(byte_len, dims.iter().product::<usize>() * 4);
    }

    #[test]
    fn values_round_trip(values in proptest::collection::vec(-1.0e6f32..1.0e6f32, 1..64)) {
        let mut m = ModelTest::new();
        m.add_tensors(1, &[0], &[0], DType::F32, &[values.len()]).expect("declare tensor");
        m.set_values(0, &values).expect("write values");

        prop_assert_eq!(m.get_values(0).expect("read values"), values.clone());
        prop_assert_eq!(m.get_values(0).expect("read values"), values);
    }
}
