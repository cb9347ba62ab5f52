//! Vector exchange against the example models.
//!
//! These tests go through [`ModelInstance`] the way a host does and check the
//! results against the model attributes directly.

use fmuvars_core::errors::FmuError;
use fmuvars_core::example_models::{AllKinds, Resizable};
use fmuvars_core::model::ModelInstance;
use fmuvars_core::value::Kind;
use ndarray::array;

mod round_trips {
    use super::*;

    #[test]
    fn test_scalars_of_every_kind() {
        let mut instance = ModelInstance::new(AllKinds::default()).unwrap();
        let r = |name: &str| instance.reference_of(name).unwrap();
        let (flag, counter, big, huge, real, label, mode) = (
            r("flag"),
            r("counter"),
            r("big"),
            r("huge"),
            r("real"),
            r("label"),
            r("mode"),
        );

        instance.set_boolean(&[flag], &[false]).unwrap();
        instance.set_int32(&[counter], &[i32::MAX]).unwrap();
        instance.set_int64(&[big, mode], &[i64::MAX, 1]).unwrap();
        instance.set_uint64(&[huge], &[u64::MAX - 1]).unwrap();
        instance.set_float64(&[real], &[1.0 / 3.0]).unwrap();
        instance
            .set_string(&[label], &["world".to_string()])
            .unwrap();

        assert_eq!(instance.get_boolean(&[flag]).unwrap(), vec![false]);
        assert_eq!(instance.get_int32(&[counter]).unwrap(), vec![i32::MAX]);
        assert_eq!(instance.get_int64(&[big, mode]).unwrap(), vec![i64::MAX, 1]);
        assert_eq!(instance.get_uint64(&[huge]).unwrap(), vec![u64::MAX - 1]);
        assert_eq!(instance.get_float64(&[real]).unwrap(), vec![1.0 / 3.0]);
        assert_eq!(
            instance.get_string(&[label]).unwrap(),
            vec!["world".to_string()]
        );

        let model = instance.model();
        assert!(!model.flag);
        assert_eq!(model.huge, u64::MAX - 1);
        assert_eq!(model.mode, 1);
        assert_eq!(model.label, "world");
    }

    #[test]
    fn test_nested_attribute() {
        let mut instance = ModelInstance::new(AllKinds::default()).unwrap();
        let level = instance.reference_of("settings.level").unwrap();
        assert_eq!(instance.get_float64(&[level]).unwrap(), vec![0.5]);

        instance.set_float64(&[level], &[0.75]).unwrap();
        assert_eq!(instance.model().settings.level, 0.75);
    }

    #[test]
    fn test_references_in_caller_order() {
        let instance = ModelInstance::new(AllKinds::default()).unwrap();
        let real = instance.reference_of("real").unwrap();
        let level = instance.reference_of("settings.level").unwrap();
        assert_eq!(
            instance.get_float64(&[level, real, level]).unwrap(),
            vec![0.5, 0.1, 0.5]
        );
    }
}

mod arrays {
    use super::*;

    #[test]
    fn test_fixed_array_row_major() {
        let mut instance = ModelInstance::new(Resizable::default()).unwrap();
        let fixed = instance.reference_of("fixed").unwrap();
        assert_eq!(
            instance.get_int32(&[fixed]).unwrap(),
            vec![0, 1, 2, 3, 4, 5]
        );

        instance
            .set_int32(&[fixed], &[10, 11, 12, 13, 14, 15])
            .unwrap();
        assert_eq!(instance.model().fixed, array![[10, 11, 12], [13, 14, 15]]);
    }

    #[test]
    fn test_variable_dimensions_follow_structural_parameters() {
        let mut instance = ModelInstance::new(Resizable::default()).unwrap();
        let rows = instance.reference_of("rows").unwrap();
        let grid = instance.reference_of("grid").unwrap();
        assert_eq!(instance.get_float64(&[grid]).unwrap().len(), 6);

        instance
            .set_float64(&[grid], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        assert_eq!(
            instance.model().grid,
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
        );

        instance.set_uint64(&[rows], &[1]).unwrap();
        assert_eq!(instance.get_float64(&[grid]).unwrap(), vec![1.0, 2.0, 3.0]);

        instance.set_uint64(&[rows], &[3]).unwrap();
        let values = instance.get_float64(&[grid]).unwrap();
        assert_eq!(values.len(), 9);
        assert_eq!(&values[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mixed_scalars_and_arrays_share_one_buffer() {
        let mut instance = ModelInstance::new(Resizable::default()).unwrap();
        let rows = instance.reference_of("rows").unwrap();
        let cols = instance.reference_of("cols").unwrap();
        let flags = instance.reference_of("flags").unwrap();

        assert_eq!(instance.get_uint64(&[rows, cols]).unwrap(), vec![2, 3]);
        instance.set_boolean(&[flags], &[false, true]).unwrap();
        assert_eq!(instance.get_boolean(&[flags]).unwrap(), vec![false, true]);
    }

    #[test]
    fn test_wrong_value_count() {
        let mut instance = ModelInstance::new(Resizable::default()).unwrap();
        let grid = instance.reference_of("grid").unwrap();
        assert_eq!(
            instance.set_float64(&[grid], &[1.0; 5]).unwrap_err(),
            FmuError::ValueCountMismatch {
                expected: 6,
                actual: 5
            }
        );
        assert_eq!(
            instance.set_float64(&[grid], &[1.0; 7]).unwrap_err(),
            FmuError::ValueCountMismatch {
                expected: 6,
                actual: 7
            }
        );
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_set_constant_is_immutable() {
        let mut instance = ModelInstance::new(AllKinds::default()).unwrap();
        let two_pi = instance.reference_of("two_pi").unwrap();
        assert_eq!(
            instance.set_float64(&[two_pi], &[1.0]).unwrap_err(),
            FmuError::ImmutableVariable {
                name: "two_pi".to_string(),
                reference: two_pi
            }
        );
        assert_eq!(
            instance.get_float64(&[two_pi]).unwrap(),
            vec![std::f64::consts::TAU]
        );
    }

    #[test]
    fn test_get_with_wrong_kind() {
        let instance = ModelInstance::new(AllKinds::default()).unwrap();
        let real = instance.reference_of("real").unwrap();
        assert_eq!(
            instance.get_int32(&[real]).unwrap_err(),
            FmuError::TypeMismatch {
                reference: real,
                expected: Kind::Int32,
                actual: Kind::Float64
            }
        );
    }

    #[test]
    fn test_unknown_reference() {
        let instance = ModelInstance::new(AllKinds::default()).unwrap();
        assert_eq!(
            instance.get_float64(&[999]).unwrap_err(),
            FmuError::UnknownReference(999)
        );
    }

    #[test]
    fn test_failed_set_keeps_earlier_writes() {
        let mut instance = ModelInstance::new(AllKinds::default()).unwrap();
        let real = instance.reference_of("real").unwrap();
        let two_pi = instance.reference_of("two_pi").unwrap();
        let err = instance
            .set_float64(&[real, two_pi], &[2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, FmuError::ImmutableVariable { .. }));
        assert_eq!(instance.model().real, 2.0);
    }
}

mod state {
    use super::*;

    #[test]
    fn test_restore_after_structural_change() {
        let mut instance = ModelInstance::new(Resizable::default()).unwrap();
        let rows = instance.reference_of("rows").unwrap();
        let grid = instance.reference_of("grid").unwrap();
        instance
            .set_float64(&[grid], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        let snapshot = instance.get_state().unwrap();

        instance.set_uint64(&[rows], &[3]).unwrap();
        assert_eq!(instance.model().grid.dim(), (3, 3));

        instance.set_state(&snapshot).unwrap();
        assert_eq!(instance.model().rows, 2);
        assert_eq!(
            instance.model().grid,
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
        );
    }

    #[test]
    fn test_entries_keep_registration_order() {
        let instance = ModelInstance::new(Resizable::default()).unwrap();
        let snapshot = instance.get_state().unwrap();
        let names: Vec<&str> = snapshot.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["rows", "cols", "grid", "fixed", "flags"]);
    }
}
