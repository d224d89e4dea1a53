use crate::core::backend::{AudioBackend, BackendError, BackendResult, ContextState, EndedCallback};
use crate::core::constants::{DEFAULT_TRACK_VOLUME, ENGINE_INITIAL_MASTER_VOLUME};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

fn js_err(e: JsValue) -> BackendError {
    BackendError::new(format!("{:?}", e))
}

fn create_gain(
    audio_ctx: &web::AudioContext,
    value: f32,
    label: &str,
) -> BackendResult<web::GainNode> {
    match web::GainNode::new(audio_ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Ok(g)
        }
        Err(e) => {
            log::error!("{} GainNode error: {:?}", label, e);
            Err(js_err(e))
        }
    }
}

/// WebAudio graph: one `AudioContext`, a master gain into the destination,
/// and a gain per track feeding the master.
pub struct WebAudioBackend {
    audio_ctx: web::AudioContext,
    master_gain: web::GainNode,
}

impl WebAudioBackend {
    pub fn new() -> BackendResult<Self> {
        let audio_ctx = web::AudioContext::new().map_err(js_err)?;
        let master_gain = create_gain(&audio_ctx, ENGINE_INITIAL_MASTER_VOLUME, "Master")?;
        master_gain
            .connect_with_audio_node(&audio_ctx.destination())
            .map_err(js_err)?;
        log::info!("[audio] context created ({:?})", audio_ctx.state());
        Ok(Self {
            audio_ctx,
            master_gain,
        })
    }
}

impl AudioBackend for WebAudioBackend {
    type Buffer = web::AudioBuffer;
    type Gain = web::GainNode;
    type Source = web::AudioBufferSourceNode;

    fn context_state(&self) -> ContextState {
        match self.audio_ctx.state() {
            web::AudioContextState::Suspended => ContextState::Suspended,
            web::AudioContextState::Running => ContextState::Running,
            _ => ContextState::Closed,
        }
    }

    async fn resume(&self) -> BackendResult<()> {
        let promise = self.audio_ctx.resume().map_err(js_err)?;
        JsFuture::from(promise).await.map_err(js_err)?;
        Ok(())
    }

    async fn fetch_and_decode(&self, location: &str) -> BackendResult<web::AudioBuffer> {
        let window = web::window().ok_or_else(|| BackendError::new("no window"))?;
        let response: web::Response = JsFuture::from(window.fetch_with_str(location))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;
        if !response.ok() {
            return Err(BackendError::new(format!(
                "HTTP {} fetching {}",
                response.status(),
                location
            )));
        }
        let bytes: js_sys::ArrayBuffer = JsFuture::from(response.array_buffer().map_err(js_err)?)
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;
        let decoded = self.audio_ctx.decode_audio_data(&bytes).map_err(js_err)?;
        JsFuture::from(decoded)
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)
    }

    fn create_track_gain(&self) -> BackendResult<web::GainNode> {
        let gain = create_gain(&self.audio_ctx, DEFAULT_TRACK_VOLUME, "Track")?;
        gain.connect_with_audio_node(&self.master_gain).map_err(js_err)?;
        Ok(gain)
    }

    fn set_gain(&self, gain: &web::GainNode, value: f32) {
        gain.gain().set_value(value);
    }

    fn release_gain(&self, gain: &web::GainNode) {
        _ = gain.disconnect();
    }

    fn set_master_gain(&self, value: f32) {
        self.master_gain.gain().set_value(value);
    }

    fn create_looping_source(
        &self,
        buffer: &web::AudioBuffer,
        gain: &web::GainNode,
    ) -> BackendResult<web::AudioBufferSourceNode> {
        let source = self.audio_ctx.create_buffer_source().map_err(js_err)?;
        source.set_buffer(Some(buffer));
        source.set_loop(true);
        source.connect_with_audio_node(gain).map_err(js_err)?;
        Ok(source)
    }

    fn on_ended(&self, source: &web::AudioBufferSourceNode, callback: EndedCallback) {
        let handler = Closure::once_into_js(move || callback());
        source.set_onended(Some(handler.unchecked_ref()));
    }

    fn start(&self, source: &web::AudioBufferSourceNode) -> BackendResult<()> {
        let scheduled: &web::AudioScheduledSourceNode = source.as_ref();
        scheduled.start().map_err(js_err)
    }

    fn stop(&self, source: &web::AudioBufferSourceNode) {
        let scheduled: &web::AudioScheduledSourceNode = source.as_ref();
        // Throws if the source never started or already stopped
        _ = scheduled.stop();
        _ = source.disconnect();
    }
}
