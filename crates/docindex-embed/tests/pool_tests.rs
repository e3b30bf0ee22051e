use candle_core::{DType, Device, Tensor};
use docindex_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_pools_each_row_independently() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[3.0f32, 0.0,  1.0, 1.0,    // row 0: both tokens
                                 0.0, 2.0,  9.0, 9.0],      // row 1: first token only
                               (2, 2, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1f32, 1.0, 1.0, 0.0], (2, 2), &dev).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    // row 0 mean = [2, 0.5]
    let n0 = (4.0f32 + 0.25).sqrt();
    assert!((v[0][0] - 2.0 / n0).abs() < 1e-5);
    assert!((v[0][1] - 0.5 / n0).abs() < 1e-5);
    assert!((v[1][0]).abs() < 1e-6);
    assert!((v[1][1] - 1.0).abs() < 1e-5);
}

#[test]
fn masked_mean_l2_rejects_non_3d_input() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((2, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((2, 4), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}

#[test]
fn fully_padded_row_pools_to_zero() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[4.0f32, 3.0, 7.0, 7.0], (2, 1, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1i64, 0], (2, 1), &dev).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    assert!((v[0][0] - 0.8).abs() < 1e-5 && (v[0][1] - 0.6).abs() < 1e-5);
    assert!(v[1].iter().all(|x| *x == 0.0), "got {:?}", v[1]);
}

#[test]
fn mask_must_match_batch_and_tokens() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((2, 3, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((2, 4), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}
