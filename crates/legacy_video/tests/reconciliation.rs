//! End-to-end tests driving a [`VideoSession`] over the headless
//! backend. The backend handle is cloned before the session takes
//! ownership so each test can arm failure knobs and inspect what
//! actually reached the window system.

use legacy_video::{
    CompatEvent, DisplayBackend, Event, HeadlessBackend, KeyMods, ModeList, PixelFormat, Rect,
    Surface, SurfaceFlags, VideoError, VideoSession, WindowEvent, BUTTON_WHEEL_UP,
};

fn session_over(desktop_w: u32, desktop_h: u32) -> (VideoSession, HeadlessBackend) {
    let backend = HeadlessBackend::new(desktop_w, desktop_h);
    let session = VideoSession::new(Box::new(backend.clone()));
    (session, backend)
}

#[test]
fn windowed_mode_without_depth_conversion_has_no_shadow() {
    let (mut session, _backend) = session_over(1920, 1080);
    let screen = session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(screen.width(), 640);
    assert_eq!(screen.height(), 480);
    assert_eq!(screen.format().bits_per_pixel(), 32);
    assert!(!screen.flags().contains(SurfaceFlags::HWPALETTE));
    // Window is created at the logical size, so no centering offset.
    assert_eq!((session.viewport().x, session.viewport().y), (0, 0));
}

#[test]
fn depth_mismatch_creates_a_dithered_shadow_surface() {
    let (mut session, _backend) = session_over(1920, 1080);
    let screen = session
        .set_video_mode(640, 480, 8, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(screen.format().bits_per_pixel(), 8);
    assert!(screen.flags().contains(SurfaceFlags::HWPALETTE));

    let palette = screen.format().palette().unwrap().borrow();
    assert_eq!(palette.len(), 256);
    // 3-3-2 ramp: every entry maps back to its own index.
    for (i, c) in palette.colors().iter().enumerate() {
        let back = (c.r & 0xe0) | ((c.g & 0xe0) >> 3) | (c.b >> 6);
        assert_eq!(back as usize, i);
    }
}

#[test]
fn anyformat_takes_the_window_depth_instead_of_a_shadow() {
    let (mut session, _backend) = session_over(1920, 1080);
    let screen = session
        .set_video_mode(640, 480, 8, SurfaceFlags::ANYFORMAT)
        .unwrap();
    assert_eq!(screen.format().bits_per_pixel(), 32);
}

#[test]
fn shadow_writes_reach_the_window_only_on_present() {
    let (mut session, backend) = session_over(1920, 1080);
    let id = {
        let screen = session
            .set_video_mode(640, 480, 8, SurfaceFlags::empty())
            .unwrap();
        screen.put_pixel(3, 3, 0xe0); // red in the 3-3-2 ramp
        screen.id()
    };

    let mut probe = backend.clone();
    let fb = probe.window_surface().unwrap();
    let before = fb.buffer.borrow()[3 * fb.pitch + 3 * 4..3 * fb.pitch + 3 * 4 + 4].to_vec();
    assert_eq!(before, vec![0, 0, 0, 0]);

    session.flip(id).unwrap();
    let after = fb.buffer.borrow()[3 * fb.pitch + 3 * 4..3 * fb.pitch + 3 * 4 + 4].to_vec();
    // XRGB8888 little-endian: index 0xe0 dithers to pure red.
    assert_eq!(after[2], 0xff);
    // One clearing present at mode set, one for the flip.
    assert_eq!(backend.present_count(), 2);
}

#[test]
fn identical_mode_request_resizes_in_place() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(backend.windows_created(), 1);

    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(backend.windows_created(), 1);

    // A plain size change still reuses the window.
    let screen = session
        .set_video_mode(800, 600, 32, SurfaceFlags::empty())
        .unwrap();
    assert_eq!((screen.width(), screen.height()), (800, 600));
    assert_eq!(backend.windows_created(), 1);
    assert_eq!(backend.window_size(), (800, 600));

    // Any flag change forces recreation.
    session
        .set_video_mode(800, 600, 32, SurfaceFlags::RESIZABLE)
        .unwrap();
    assert_eq!(backend.windows_created(), 2);
}

#[test]
fn depth_change_forces_recreation() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    session
        .set_video_mode(640, 480, 8, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(backend.windows_created(), 2);
}

#[test]
fn zero_dimensions_resolve_to_the_desktop() {
    let (mut session, _backend) = session_over(1280, 720);
    let screen = session.set_video_mode(0, 0, 0, SurfaceFlags::empty()).unwrap();
    assert_eq!((screen.width(), screen.height()), (1280, 720));
    assert_eq!(screen.format().bits_per_pixel(), 32);
}

#[test]
fn granted_flags_come_from_the_window_system() {
    let (mut session, backend) = session_over(1920, 1080);
    backend.deny_fullscreen(true);
    let screen = session
        .set_video_mode(640, 480, 32, SurfaceFlags::FULLSCREEN)
        .unwrap();
    assert!(!screen.flags().contains(SurfaceFlags::FULLSCREEN));
}

#[test]
fn fullscreen_mode_centers_the_logical_surface() {
    let (mut session, backend) = session_over(1920, 1080);
    let id = session
        .set_video_mode(640, 480, 32, SurfaceFlags::FULLSCREEN)
        .unwrap()
        .id();
    assert_eq!(
        (session.viewport().x, session.viewport().y),
        ((1920 - 640) / 2, (1080 - 480) / 2)
    );

    session.flip(id).unwrap();
    assert_eq!(
        backend.last_presented(),
        vec![Rect::new(640, 300, 640, 480)]
    );
}

#[test]
fn foreign_surfaces_are_ignored_by_presents() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    let presents = backend.present_count();

    let foreign = Surface::owned(64, 64, 32, SurfaceFlags::empty());
    session.flip(foreign.id()).unwrap();
    session
        .update_rects(foreign.id(), &[Rect::new(0, 0, 64, 64)])
        .unwrap();
    assert_eq!(backend.present_count(), presents);
}

#[test]
fn toggle_fullscreen_preserves_screen_contents() {
    let (mut session, _backend) = session_over(1920, 1080);
    {
        let screen = session
            .set_video_mode(640, 480, 32, SurfaceFlags::empty())
            .unwrap();
        screen.put_pixel(10, 10, 0x00ff_0000);
    }

    session.toggle_fullscreen().unwrap();
    {
        let screen = session.screen().unwrap();
        assert!(screen.flags().contains(SurfaceFlags::FULLSCREEN));
        assert_eq!((screen.width(), screen.height()), (640, 480));
        assert_eq!(screen.get_pixel(10, 10), Some(0x00ff_0000));
    }
    assert_ne!((session.viewport().x, session.viewport().y), (0, 0));

    session.toggle_fullscreen().unwrap();
    let screen = session.screen().unwrap();
    assert!(!screen.flags().contains(SurfaceFlags::FULLSCREEN));
    assert_eq!(screen.get_pixel(10, 10), Some(0x00ff_0000));
    assert_eq!((session.viewport().x, session.viewport().y), (0, 0));
}

#[test]
fn toggle_aborts_cleanly_when_the_mode_switch_fails() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    backend.fail_fullscreen_change(true);

    assert!(session.toggle_fullscreen().is_err());
    let screen = session.screen().unwrap();
    assert!(!screen.flags().contains(SurfaceFlags::FULLSCREEN));
    assert_eq!(backend.window_size(), (640, 480));
}

#[test]
fn toggle_without_a_mode_is_an_error() {
    let (mut session, _backend) = session_over(1920, 1080);
    assert!(matches!(
        session.toggle_fullscreen(),
        Err(VideoError::NoModeSet)
    ));
}

#[test]
fn losing_the_window_surface_mid_toggle_is_fatal() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    backend.fail_surface_fetch(true);
    assert!(matches!(
        session.toggle_fullscreen(),
        Err(VideoError::SurfaceLost)
    ));
}

#[test]
fn toggle_keeps_the_shadow_when_depths_still_differ() {
    let (mut session, backend) = session_over(1920, 1080);
    let id = session
        .set_video_mode(640, 480, 8, SurfaceFlags::empty())
        .unwrap()
        .id();

    // The window comes back at a different native depth.
    backend.set_native_format(PixelFormat::new(16));
    session.toggle_fullscreen().unwrap();

    let screen = session.screen().unwrap();
    assert_eq!(screen.id(), id);
    assert_eq!(screen.format().bits_per_pixel(), 8);
    session.flip(id).unwrap();
}

#[test]
fn toggle_births_a_shadow_when_the_native_depth_changes() {
    let (mut session, backend) = session_over(1920, 1080);
    let id = session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap()
        .id();

    backend.set_native_format(PixelFormat::new(16));
    session.toggle_fullscreen().unwrap();

    // The application keeps its 32-bit surface; conversion happens
    // behind its back.
    let screen = session.screen().unwrap();
    assert_eq!(screen.id(), id);
    assert_eq!(screen.format().bits_per_pixel(), 32);

    let mut probe = backend.clone();
    let fb = probe.window_surface().unwrap();
    assert_eq!(fb.format.bits_per_pixel(), 16);
}

#[test]
fn toggle_retires_the_shadow_when_formats_converge() {
    let (mut session, backend) = session_over(1920, 1080);
    let id = session
        .set_video_mode(640, 480, 16, SurfaceFlags::empty())
        .unwrap()
        .id();

    backend.set_native_format(PixelFormat::new(16));
    session.toggle_fullscreen().unwrap();

    // The former shadow now aliases the window directly: writes land
    // without a present.
    let screen_id = {
        let screen = session.screen_mut().unwrap();
        assert_eq!(screen.id(), id);
        screen.put_pixel(0, 0, 0xf800);
        screen.id()
    };
    assert_eq!(screen_id, id);

    let mut probe = backend.clone();
    let fb = probe.window_surface().unwrap();
    let vx = session.viewport().x as usize;
    let vy = session.viewport().y as usize;
    let at = vy * fb.pitch + vx * 2;
    let bytes = fb.buffer.borrow()[at..at + 2].to_vec();
    assert_eq!(bytes, vec![0x00, 0xf8]);
}

#[test]
fn wheel_events_expand_to_button_pair_then_wheel() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    backend.push_event(Event::Wheel { dx: 0, dy: 1 });

    let first = session.poll_event().unwrap();
    assert!(matches!(
        first,
        CompatEvent::MouseButton {
            button: BUTTON_WHEEL_UP,
            pressed: true,
            ..
        }
    ));
    let second = session.poll_event().unwrap();
    assert!(matches!(
        second,
        CompatEvent::MouseButton {
            button: BUTTON_WHEEL_UP,
            pressed: false,
            ..
        }
    ));
    let third = session.poll_event().unwrap();
    assert_eq!(third, CompatEvent::Wheel { x: 0, y: 1 });
    assert!(session.poll_event().is_none());
}

#[test]
fn key_events_carry_synthesized_characters() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    backend.push_event(Event::KeyDown {
        sym: u32::from(b'a'),
        mods: KeyMods::SHIFT,
    });
    backend.push_event(Event::KeyDown {
        sym: u32::from(b'a'),
        mods: KeyMods::SHIFT | KeyMods::CAPS,
    });

    assert_eq!(
        session.poll_event(),
        Some(CompatEvent::KeyDown {
            sym: u32::from(b'a'),
            unicode: u32::from(b'A'),
        })
    );
    // Shift and caps cancel out.
    assert_eq!(
        session.poll_event(),
        Some(CompatEvent::KeyDown {
            sym: u32::from(b'a'),
            unicode: u32::from(b'a'),
        })
    );
}

#[test]
fn pointer_events_are_shifted_into_logical_coordinates() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::FULLSCREEN)
        .unwrap();
    backend.push_event(Event::MouseMotion {
        x: 700,
        y: 350,
        xrel: 1,
        yrel: 2,
    });

    assert_eq!(
        session.poll_event(),
        Some(CompatEvent::MouseMotion {
            x: 700 - 640,
            y: 350 - 300,
            xrel: 1,
            yrel: 2,
        })
    );
}

#[test]
fn resize_events_are_suppressed_while_fullscreen() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::FULLSCREEN)
        .unwrap();
    backend.push_event(Event::Window(WindowEvent::Resized { w: 1920, h: 1080 }));
    // Only the raw window notification is delivered; no legacy resize
    // is synthesized, so the letterbox dimensions never leak.
    assert_eq!(
        session.poll_event(),
        Some(CompatEvent::Window(WindowEvent::Resized { w: 1920, h: 1080 }))
    );
    assert!(session.poll_event().is_none());
}

#[test]
fn resize_events_pass_through_when_windowed() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::RESIZABLE)
        .unwrap();
    backend.push_event(Event::Window(WindowEvent::Resized { w: 800, h: 600 }));
    assert_eq!(
        session.poll_event(),
        Some(CompatEvent::VideoResize { w: 800, h: 600 })
    );
    // The raw notification follows the synthesized resize.
    assert_eq!(
        session.poll_event(),
        Some(CompatEvent::Window(WindowEvent::Resized { w: 800, h: 600 }))
    );
}

#[test]
fn untranslated_sessions_deliver_raw_shapes() {
    let (mut session, backend) = session_over(1920, 1080);
    // No mode set, so no filter installed yet.
    assert!(!session.filter_installed());
    backend.push_event(Event::Wheel { dx: 0, dy: -1 });
    assert_eq!(session.poll_event(), Some(CompatEvent::Wheel { x: 0, y: -1 }));
}

#[test]
fn screensaver_follows_the_fullscreen_default() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert!(backend.screensaver_enabled());

    session
        .set_video_mode(640, 480, 32, SurfaceFlags::FULLSCREEN)
        .unwrap();
    assert!(!backend.screensaver_enabled());
}

#[test]
fn caption_survives_window_recreation() {
    let (mut session, backend) = session_over(1920, 1080);
    session.set_caption("hello");
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(backend.window_title().as_deref(), Some("hello"));

    session.set_caption("renamed");
    assert_eq!(backend.window_title().as_deref(), Some("renamed"));
    assert_eq!(session.caption(), Some("renamed"));

    // Forced recreation keeps the caption.
    session
        .set_video_mode(640, 480, 8, SurfaceFlags::empty())
        .unwrap();
    assert_eq!(backend.window_title().as_deref(), Some("renamed"));
}

#[test]
fn mode_queries_reflect_the_display() {
    let (session, _backend) = session_over(1920, 1080);
    assert_eq!(session.mode_ok(640, 480, 32, SurfaceFlags::FULLSCREEN), 32);
    assert_eq!(session.mode_ok(123, 456, 32, SurfaceFlags::FULLSCREEN), 0);
    assert_eq!(session.mode_ok(123, 456, 32, SurfaceFlags::empty()), 32);

    assert_eq!(
        session.list_modes(32, SurfaceFlags::empty()),
        ModeList::Unrestricted
    );
    assert_eq!(
        session.list_modes(32, SurfaceFlags::FULLSCREEN),
        ModeList::Modes(vec![(1920, 1080), (1280, 720), (1024, 768), (640, 480)])
    );
    assert_eq!(
        session.list_modes(8, SurfaceFlags::FULLSCREEN),
        ModeList::Modes(vec![])
    );

    let info = session.video_info();
    assert_eq!((info.current_w, info.current_h), (1920, 1080));
    assert_eq!(info.format.bits_per_pixel(), 32);
}

#[test]
fn palette_updates_only_apply_to_indexed_screens() {
    let (mut session, _backend) = session_over(1920, 1080);
    let id = session
        .set_video_mode(640, 480, 8, SurfaceFlags::empty())
        .unwrap()
        .id();
    let written = session
        .set_colors(id, 0, &[legacy_video::Color::rgb(1, 2, 3)])
        .unwrap();
    assert_eq!(written, 1);

    let id = session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap()
        .id();
    assert!(matches!(
        session.set_colors(id, 0, &[legacy_video::Color::rgb(1, 2, 3)]),
        Err(VideoError::NoPalette)
    ));
}

#[test]
fn gl_modes_have_a_context_and_no_pixels() {
    let (mut session, backend) = session_over(1920, 1080);
    let screen = session
        .set_video_mode(640, 480, 32, SurfaceFlags::OPENGL)
        .unwrap();
    assert!(screen.flags().contains(SurfaceFlags::OPENGL));
    assert!(!screen.has_pixels());
    assert!(backend.gl_context_active());

    session.gl_swap_buffers();

    // Leaving GL tears the context down.
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert!(!backend.gl_context_active());
}

#[test]
fn overlays_are_rejected() {
    let (mut session, _backend) = session_over(1920, 1080);
    assert!(matches!(
        session.create_yuv_overlay(320, 240),
        Err(VideoError::Unsupported(_))
    ));
}

#[test]
fn gamma_scalars_install_matching_ramps() {
    let (mut session, backend) = session_over(1920, 1080);
    session.set_gamma(1.0, 1.0, 1.0).unwrap();
    let (r, g, b) = backend.gamma_ramp().unwrap();
    assert_eq!(r[0], 0);
    assert_eq!(r[255], 0xffff);
    assert_eq!(r, g);
    assert_eq!(g, b);

    session.set_gamma(2.2, 2.2, 2.2).unwrap();
    let (r, _, _) = backend.gamma_ramp().unwrap();
    assert!(r[128] > (128 << 8 | 128));
}

#[test]
fn grab_and_warp_round_trip() {
    let (mut session, backend) = session_over(1920, 1080);
    session
        .set_video_mode(640, 480, 32, SurfaceFlags::empty())
        .unwrap();
    assert!(session.set_grab(true));
    assert!(session.grab());
    session.warp_mouse(12, 34);
    assert_eq!(
        backend.pointer_position(),
        (12, 34)
    );
    assert!(!session.set_grab(false));
}

#[test]
fn driver_name_is_forwarded() {
    let (session, _backend) = session_over(1920, 1080);
    assert_eq!(session.video_driver_name(), "headless");
}
