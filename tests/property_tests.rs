#[cfg(test)]
mod property_tests {
    use ddp_metrics::distributed::{reduce_tensors, run_workers, ReduceOp};
    use ddp_metrics::functional::{self, ClassAverage};
    use ddp_metrics::metric::{Accuracy, Metric};
    use ddp_metrics::types::{scalar_value, Tensor};
    use ndarray::{Array1, ArrayView1};
    use proptest::prelude::*;
    use std::time::Duration;

    // Paired prediction/target labels over `classes` classes
    fn label_pairs(classes: usize, max_len: usize) -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
        (1..=max_len).prop_flat_map(move |n| {
            (
                prop::collection::vec(0..classes, n),
                prop::collection::vec(0..classes, n),
            )
        })
    }

    // Scores with binary targets that always contain both classes
    fn scored_binary(max_len: usize) -> impl Strategy<Value = (Vec<f32>, Vec<usize>)> {
        (2..=max_len)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(0.0f32..1.0, n),
                    prop::collection::vec(0usize..2, n),
                )
            })
            .prop_map(|(scores, mut target)| {
                target[0] = 0;
                target[1] = 1;
                (scores, target)
            })
    }

    fn view(labels: &[usize]) -> ArrayView1<usize> {
        ArrayView1::from(labels)
    }

    proptest! {
        #[test]
        fn test_accuracy_is_fraction_of_matches((pred, target) in label_pairs(5, 64)) {
            let matches = pred.iter().zip(&target).filter(|(p, t)| p == t).count();
            let value = functional::accuracy(view(&pred), view(&target)).unwrap();
            prop_assert!((value - matches as f32 / pred.len() as f32).abs() < 1e-6);
            prop_assert!((0.0..=1.0).contains(&value));
        }

        #[test]
        fn test_f1_is_harmonic_mean((pred, target) in label_pairs(4, 64)) {
            for average in [ClassAverage::Micro, ClassAverage::None] {
                let (p, r) = functional::precision_recall(view(&pred), view(&target), Some(4), average, 0.0).unwrap();
                let f1 = functional::f1_score(view(&pred), view(&target), Some(4), average, 0.0).unwrap();
                for ((p, r), f) in p.iter().zip(r.iter()).zip(f1.iter()) {
                    if *p > 0.0 && *r > 0.0 {
                        prop_assert!((f - 2.0 * p * r / (p + r)).abs() < 1e-5);
                    }
                }
            }
        }

        #[test]
        fn test_zero_division_fallback_is_returned(fallback in -1.0f32..1.0, n in 1usize..32) {
            // nothing is ever predicted as class 1
            let pred = vec![0usize; n];
            let target = vec![0usize; n];
            let precision = functional::precision(view(&pred), view(&target), Some(2), ClassAverage::None, fallback)
                .unwrap();
            prop_assert_eq!(precision[[1]], fallback);
            prop_assert_eq!(precision[[0]], 1.0);
        }

        #[test]
        fn test_roc_is_monotone((scores, target) in scored_binary(64)) {
            let curve = functional::roc(
                Array1::from(scores).view(),
                Array1::from(target).view(),
                None,
                1,
            ).unwrap();

            for w in curve.fpr.windows(2) {
                prop_assert!(w[1] >= w[0]);
            }
            for w in curve.tpr.windows(2) {
                prop_assert!(w[1] >= w[0]);
            }
            for w in curve.thresholds.windows(2) {
                prop_assert!(w[1] < w[0]);
            }
            prop_assert_eq!(curve.fpr[curve.fpr.len() - 1], 1.0);
            prop_assert_eq!(curve.tpr[curve.tpr.len() - 1], 1.0);
        }

        #[test]
        fn test_auroc_is_bounded((scores, target) in scored_binary(64)) {
            let value = functional::auroc(
                Array1::from(scores).view(),
                Array1::from(target).view(),
                None,
                1,
            ).unwrap();
            prop_assert!((-1e-5..=1.0 + 1e-5).contains(&value));
        }

        #[test]
        fn test_mean_reduction_is_average(values in prop::collection::vec(-100.0f32..100.0, 1..8)) {
            let tensors: Vec<Tensor> = values.iter().map(|&v| ndarray::arr0(v).into_dyn()).collect();
            let mean = reduce_tensors(&tensors, ReduceOp::Mean).unwrap();
            let expected = values.iter().sum::<f32>() / values.len() as f32;
            prop_assert!((mean[[]] - expected).abs() < 1e-3);

            let max = reduce_tensors(&tensors, ReduceOp::Max).unwrap();
            prop_assert!(values.iter().all(|&v| v <= max[[]]));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_group_mean_matches_local_mean(
            batches in prop::collection::vec(label_pairs(3, 16), 1..5)
        ) {
            let local: Vec<f32> = batches
                .iter()
                .map(|(p, t)| functional::accuracy(view(p), view(t)).unwrap())
                .collect();
            let expected = local.iter().sum::<f32>() / local.len() as f32;

            let to_tensor = |labels: &[usize]| -> Tensor {
                labels.iter().map(|&l| l as f32).collect::<Array1<f32>>().into_dyn()
            };
            let reduced = run_workers(batches.len(), Duration::from_secs(10), |rank, reducer| {
                let (pred, target) = &batches[rank];
                let value = Accuracy::new()
                    .with_reducer(reducer)
                    .forward(&to_tensor(pred), &to_tensor(target))?;
                scalar_value(&value)
            })
            .unwrap();

            for value in reduced {
                prop_assert!((value - expected).abs() < 1e-5);
            }
        }
    }
}
