// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 GStreamer pipeline for camera capture
//!
//! `v4l2src → decodebin → videoconvert → videocrop → videoscale → NV12 appsink`
//!
//! The crop element doubles as the digital zoom: cropping the centre and
//! scaling back up to the stream size.

use super::super::FrameSender;
use super::super::types::*;
use crate::constants::{pipeline, timing, zoom};
use crate::session::use_cases::StreamConfig;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Running capture pipeline. Stops when dropped.
pub struct GstCameraPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    crop: gstreamer::Element,
}

fn build_pipeline_string(device_path: &str, stream: &StreamConfig) -> String {
    format!(
        "v4l2src device={device} ! decodebin ! videoconvert ! videocrop name=zoom ! \
         videoscale ! video/x-raw,format={format},width={width},height={height} ! \
         appsink name=sink",
        device = device_path,
        format = pipeline::OUTPUT_FORMAT,
        width = stream.width,
        height = stream.height,
    )
}

/// Per-side crop (left/right, top/bottom) for a centre crop at `ratio`, kept even
pub(crate) fn centre_crop(width: u32, height: u32, ratio: f32) -> (u32, u32) {
    let ratio = ratio.clamp(1.0, zoom::MAX_DIGITAL_ZOOM);
    let crop_w = (width as f32 / ratio) as u32;
    let crop_h = (height as f32 / ratio) as u32;
    let side_x = (width.saturating_sub(crop_w) / 2) & !1;
    let side_y = (height.saturating_sub(crop_h) / 2) & !1;
    (side_x, side_y)
}

impl GstCameraPipeline {
    pub fn new(
        device: &CameraDevice,
        stream: &StreamConfig,
        sender: FrameSender,
    ) -> BackendResult<Self> {
        info!(device = %device.name, path = %device.path, stream = %stream, "Creating V4L2 pipeline");

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let description = build_pipeline_string(&device.path, stream);
        debug!(pipeline = %description, "Launching pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Not a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;
        let crop = pipeline
            .by_name("zoom")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get videocrop".to_string()))?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let frame_counter = AtomicU64::new(0);
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_start = Instant::now();
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to pull sample");
                        }
                        gstreamer::FlowError::Eos
                    })?;

                    let caps = sample.caps().ok_or(gstreamer::FlowError::Error)?;
                    let video_info =
                        VideoInfo::from_caps(caps).map_err(|_| gstreamer::FlowError::Error)?;

                    let buffer = sample.buffer_owned().ok_or(gstreamer::FlowError::Error)?;
                    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            warn!(frame = frame_num, "Buffer marked as corrupted, skipping frame");
                        }
                        return Ok(gstreamer::FlowSuccess::Ok);
                    }

                    // Zero-copy: the mapping lives as long as the frame
                    let mapped = buffer
                        .into_mapped_buffer_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;

                    let stride_y = video_info.stride()[0] as u32;
                    let stride_uv = video_info.stride()[1] as u32;
                    let offset_uv = video_info.offset()[1];

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: FrameData::from_mapped_buffer(mapped),
                        format: PixelFormat::NV12,
                        stride: stride_y,
                        yuv_planes: Some(YuvPlanes {
                            uv_offset: offset_uv,
                            uv_stride: stride_uv,
                            v_offset: 0,
                            v_stride: 0,
                        }),
                        captured_at: frame_start,
                        sequence: frame_num,
                    };

                    sender(frame);

                    if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        debug!(
                            frame = frame_num,
                            total_us = frame_start.elapsed().as_micros(),
                            "Frame performance"
                        );
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, pending) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");

        if let Some(message) = pipeline_error(&pipeline) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::InitializationFailed(message));
        }
        if state != gstreamer::State::Playing {
            warn!("Pipeline is not in PLAYING state");
        }

        info!("V4L2 camera initialization complete");

        Ok(Self {
            pipeline,
            appsink,
            crop,
        })
    }

    /// Apply a digital zoom ratio (1.0 = full field of view)
    pub fn set_digital_zoom(&self, ratio: f32) -> BackendResult<()> {
        let caps = self
            .crop
            .static_pad("sink")
            .and_then(|pad| pad.current_caps())
            .ok_or_else(|| BackendError::ControlFailed("stream not negotiated yet".to_string()))?;
        let info = VideoInfo::from_caps(&caps)
            .map_err(|e| BackendError::ControlFailed(e.to_string()))?;

        let (side_x, side_y) = centre_crop(info.width(), info.height(), ratio);
        self.crop.set_property("left", side_x as i32);
        self.crop.set_property("right", side_x as i32);
        self.crop.set_property("top", side_y as i32);
        self.crop.set_property("bottom", side_y as i32);

        debug!(ratio, side_x, side_y, "Digital zoom applied");
        Ok(())
    }
}

/// First error message waiting on the pipeline bus, if any
fn pipeline_error(pipeline: &gstreamer::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let message = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
    match message.view() {
        gstreamer::MessageView::Error(err) => {
            error!(error = %err.error(), debug = ?err.debug(), "Pipeline error");
            Some(err.error().to_string())
        }
        _ => None,
    }
}

impl Drop for GstCameraPipeline {
    fn drop(&mut self) {
        info!("Stopping V4L2 pipeline");
        // Callbacks hold the frame sender; release it before the pipeline goes
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, "V4L2 pipeline stopped");
    }
}
