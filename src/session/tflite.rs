use std::path::Path;
use std::time::{Duration, Instant};

use tflite::ops::builtin::BuiltinOpResolver;
use tflite::{FlatBufferModel, Interpreter, InterpreterBuilder};

use crate::session::InferenceSession;
use crate::{DetectorError, Result};

type TensorIndex = i32;

fn tflite_err(err: tflite::Error) -> DetectorError {
    DetectorError::session(format!("tflite: {err}"))
}

/// TensorFlow Lite interpreter addressed by tensor name.
pub struct TfliteSession {
    interpreter: Option<Interpreter<'static, BuiltinOpResolver>>,
    invocations: u64,
    last_invoke: Duration,
    total_invoke: Duration,
    stats: bool,
}

impl TfliteSession {
    pub fn open(model_path: &Path, num_threads: usize) -> Result<Self> {
        tracing::info!(path = %model_path.display(), "loading tflite model");
        let model = FlatBufferModel::build_from_file(model_path).map_err(tflite_err)?;
        let resolver = BuiltinOpResolver::default();
        let builder = InterpreterBuilder::new(model, resolver).map_err(tflite_err)?;
        let mut interpreter = builder.build().map_err(tflite_err)?;
        interpreter.set_num_threads(num_threads as i32);
        interpreter.allocate_tensors().map_err(tflite_err)?;

        tracing::debug!(
            inputs = interpreter.inputs().len(),
            outputs = interpreter.outputs().len(),
            "tflite interpreter ready"
        );

        Ok(Self {
            interpreter: Some(interpreter),
            invocations: 0,
            last_invoke: Duration::ZERO,
            total_invoke: Duration::ZERO,
            stats: false,
        })
    }

    fn interpreter(&mut self) -> Result<&mut Interpreter<'static, BuiltinOpResolver>> {
        self.interpreter
            .as_mut()
            .ok_or_else(|| DetectorError::session("tflite session is closed"))
    }
}

fn find_tensor(
    interpreter: &Interpreter<'static, BuiltinOpResolver>,
    candidates: &[TensorIndex],
    name: &str,
) -> Result<TensorIndex> {
    candidates
        .iter()
        .copied()
        .find(|&index| {
            interpreter
                .tensor_info(index)
                .is_some_and(|info| info.name == name)
        })
        .ok_or_else(|| DetectorError::session(format!("model has no tensor named '{name}'")))
}

impl InferenceSession for TfliteSession {
    fn feed(&mut self, name: &str, data: &[u8], dims: [usize; 4]) -> Result<()> {
        let interpreter = self.interpreter()?;
        let inputs = interpreter.inputs().to_vec();
        let index = find_tensor(interpreter, &inputs, name)?;

        if let Some(info) = interpreter.tensor_info(index) {
            if info.dims != dims {
                return Err(DetectorError::session(format!(
                    "input '{name}' has shape {:?}, fed {:?}",
                    info.dims, dims
                )));
            }
        }

        // quantized models take bytes directly, float models take [-1, 1]
        if interpreter.tensor_data::<u8>(index).is_ok() {
            let dst = interpreter.tensor_data_mut::<u8>(index).map_err(tflite_err)?;
            if dst.len() != data.len() {
                return Err(DetectorError::session(format!(
                    "input '{name}' holds {} bytes, fed {}",
                    dst.len(),
                    data.len()
                )));
            }
            dst.copy_from_slice(data);
        } else {
            let dst = interpreter.tensor_data_mut::<f32>(index).map_err(tflite_err)?;
            if dst.len() != data.len() {
                return Err(DetectorError::session(format!(
                    "input '{name}' holds {} values, fed {}",
                    dst.len(),
                    data.len()
                )));
            }
            for (d, &s) in dst.iter_mut().zip(data) {
                *d = (s as f32 - 127.5) / 127.5;
            }
        }
        Ok(())
    }

    fn run(&mut self, output_names: &[String], collect_stats: bool) -> Result<()> {
        let interpreter = self.interpreter()?;
        let outputs = interpreter.outputs().to_vec();
        for name in output_names {
            find_tensor(interpreter, &outputs, name)?;
        }

        let start = Instant::now();
        interpreter.invoke().map_err(tflite_err)?;
        let elapsed = start.elapsed();

        self.stats = collect_stats;
        if collect_stats {
            self.invocations += 1;
            self.last_invoke = elapsed;
            self.total_invoke += elapsed;
        }
        Ok(())
    }

    fn fetch(&mut self, name: &str, dst: &mut [f32]) -> Result<usize> {
        let interpreter = self.interpreter()?;
        let outputs = interpreter.outputs().to_vec();
        let index = find_tensor(interpreter, &outputs, name)?;
        let values: &[f32] = interpreter.tensor_data(index).map_err(tflite_err)?;
        let len = values.len().min(dst.len());
        dst[..len].copy_from_slice(&values[..len]);
        Ok(len)
    }

    fn stat_string(&self) -> String {
        if !self.stats || self.invocations == 0 {
            return String::new();
        }
        let mean = self.total_invoke / self.invocations as u32;
        format!(
            "invocations: {}, last invoke: {:.3}ms, mean invoke: {:.3}ms",
            self.invocations,
            self.last_invoke.as_secs_f64() * 1000.0,
            mean.as_secs_f64() * 1000.0
        )
    }

    fn close(&mut self) {
        if self.interpreter.take().is_some() {
            tracing::debug!("tflite interpreter released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_session() -> TfliteSession {
        TfliteSession {
            interpreter: None,
            invocations: 0,
            last_invoke: Duration::ZERO,
            total_invoke: Duration::ZERO,
            stats: false,
        }
    }

    #[test]
    fn test_open_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let result = TfliteSession::open(&dir.path().join("missing.tflite"), 1);
        match result {
            Err(DetectorError::Session(message)) => assert!(message.starts_with("tflite:")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected missing model to fail"),
        }
    }

    #[test]
    fn test_open_garbage_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.tflite");
        std::fs::write(&path, b"not a flatbuffer").unwrap();
        assert!(matches!(TfliteSession::open(&path, 1), Err(DetectorError::Session(_))));
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let mut session = closed_session();
        session.close();
        session.close();

        assert!(matches!(
            session.feed("image_tensor", &[0; 12], [1, 2, 2, 3]),
            Err(DetectorError::Session(_))
        ));
        assert!(matches!(session.run(&[], false), Err(DetectorError::Session(_))));
        let mut dst = [0.0f32; 1];
        assert!(session.fetch("num_detections", &mut dst).is_err());
        assert_eq!(session.stat_string(), "");
    }

    #[test]
    fn test_stat_string_reports_invocations() {
        let mut session = closed_session();
        session.stats = true;
        session.invocations = 2;
        session.last_invoke = Duration::from_millis(4);
        session.total_invoke = Duration::from_millis(10);
        assert_eq!(
            session.stat_string(),
            "invocations: 2, last invoke: 4.000ms, mean invoke: 5.000ms"
        );
    }
}
