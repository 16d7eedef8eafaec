use anyhow::{Context, Result};
use image::{imageops, RgbImage};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

/// Capture window inside a camera frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CropRegion {
    /// 250x250 window around the centre of a 640x480 webcam frame
    fn default() -> Self {
        Self {
            x: 195,
            y: 115,
            width: 250,
            height: 250,
        }
    }
}

/// Cut `region` out of `frame`. The region is clamped to the frame bounds.
pub fn crop(frame: &RgbImage, region: CropRegion) -> Result<RgbImage> {
    let (fw, fh) = frame.dimensions();
    let x = region.x.min(fw);
    let y = region.y.min(fh);
    let width = region.width.min(fw - x);
    let height = region.height.min(fh - y);

    if width == 0 || height == 0 {
        anyhow::bail!(
            "crop region {:?} does not intersect {}x{} frame",
            region,
            fw,
            fh
        );
    }
    if width != region.width || height != region.height {
        log::warn!(
            "crop region {:?} clamped to {}x{} for {}x{} frame",
            region,
            width,
            height,
            fw,
            fh
        );
    }

    Ok(imageops::crop_imm(frame, x, y, width, height).to_image())
}

pub struct Camera {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    fourcc: FourCC,
}

impl Camera {
    pub fn open(device: &str) -> Result<Self> {
        let dev = Device::with_path(device).with_context(|| format!("open camera {device}"))?;
        let mut fmt = dev.format().context("get format")?;
        // Prefer RGB, fallback to YUYV, else accept existing format
        let desired = Format::new(fmt.width, fmt.height, FourCC::new(b"RGB3"));
        fmt = dev.set_format(&desired).unwrap_or(fmt);
        if fmt.fourcc != FourCC::new(b"RGB3") {
            let yuyv = Format::new(fmt.width, fmt.height, FourCC::new(b"YUYV"));
            fmt = dev.set_format(&yuyv).unwrap_or(fmt);
        }
        log::info!(
            "camera {}: {}x{} {}",
            device,
            fmt.width,
            fmt.height,
            fmt.fourcc
        );
        let stream = Stream::with_buffers(&dev, Type::VideoCapture, 4).context("stream")?;
        Ok(Self {
            stream,
            width: fmt.width,
            height: fmt.height,
            fourcc: fmt.fourcc,
        })
    }

    pub fn frame(&mut self) -> Result<RgbImage> {
        let (data, meta) = self.stream.next().context("capture frame")?;
        log::debug!(
            "captured frame: seq={} len={}",
            meta.sequence,
            data.len()
        );
        to_rgb(self.fourcc, self.width, self.height, data)
    }
}

/// Convert one raw V4L2 buffer to an RGB image
pub fn to_rgb(fourcc: FourCC, width: u32, height: u32, data: &[u8]) -> Result<RgbImage> {
    let expected = (width * height * 3) as usize;
    let mut buf = if fourcc == FourCC::new(b"RGB3") {
        data.to_vec()
    } else if fourcc == FourCC::new(b"YUYV") {
        yuyv_to_rgb(width, height, data)?
    } else if fourcc == FourCC::new(b"GREY") {
        grey_to_rgb(width, height, data)?
    } else {
        log::warn!(
            "unexpected pixel format {}, passing through raw len={}",
            fourcc,
            data.len()
        );
        data.to_vec()
    };

    if buf.len() < expected {
        anyhow::bail!(
            "buffer too small: got {}, expected {} (fourcc {})",
            buf.len(),
            expected,
            fourcc
        );
    }
    // Drivers may pad the final buffer
    buf.truncate(expected);

    RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| anyhow::anyhow!("failed to build image buffer"))
}

fn yuyv_to_rgb(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        anyhow::bail!("short YUYV buffer");
    }
    let mut out = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            out.push(clamp(y + 1.402 * v));
            out.push(clamp(y - 0.344136 * u - 0.714136 * v));
            out.push(clamp(y + 1.772 * u));
        }
    }
    Ok(out)
}

fn clamp(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

fn grey_to_rgb(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>> {
    let expected = (width * height) as usize;
    if data.len() < expected {
        anyhow::bail!("short GREY buffer");
    }
    Ok(data[..expected].iter().flat_map(|&y| [y, y, y]).collect())
}
