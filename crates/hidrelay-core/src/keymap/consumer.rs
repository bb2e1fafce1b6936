//! Evdev multimedia/system codes → HID consumer-control page (0x0C) usages.
//!
//! This is the table behind the dedicated consumer-control gadget endpoint:
//! transport keys, volume, browser/application launchers, TV/media-center
//! keys, and display controls. Usage values follow the kernel's consumer-page
//! mapping in `hid-input.c`, read in reverse.
//!
//! Several distinct evdev codes intentionally share a usage (e.g. `KEY_MAIL`
//! and `KEY_EMAIL` both emit AL Email Reader 0x18A): keyboards disagree on
//! which code they send, the downstream host expects one usage.

use super::lookup;

/// Returns the consumer-page usage for an evdev code, or `None` if the code
/// is not a consumer-control key.
pub fn usage_for(code: u16) -> Option<u16> {
    lookup(TABLE, code)
}

/// Sorted `(evdev code, consumer usage)` pairs.
pub(crate) static TABLE: &[(u16, u16)] = &[
    (113, 0x0E2), // KEY_MUTE
    (114, 0x0EA), // KEY_VOLUMEDOWN
    (115, 0x0E9), // KEY_VOLUMEUP
    (116, 0x030), // KEY_POWER
    (139, 0x040), // KEY_MENU
    (140, 0x192), // KEY_CALC
    (142, 0x032), // KEY_SLEEP
    (144, 0x194), // KEY_FILE
    (150, 0x196), // KEY_WWW
    (152, 0x19E), // KEY_COFFEE (lock screen)
    (155, 0x18A), // KEY_MAIL
    (156, 0x22A), // KEY_BOOKMARKS
    (157, 0x194), // KEY_COMPUTER
    (158, 0x224), // KEY_BACK
    (159, 0x225), // KEY_FORWARD
    (161, 0x0B8), // KEY_EJECTCD
    (162, 0x0B8), // KEY_EJECTCLOSECD
    (163, 0x0B5), // KEY_NEXTSONG
    (164, 0x0CD), // KEY_PLAYPAUSE
    (165, 0x0B6), // KEY_PREVIOUSSONG
    (166, 0x0B7), // KEY_STOPCD
    (167, 0x0B2), // KEY_RECORD
    (168, 0x0B4), // KEY_REWIND
    (169, 0x08C), // KEY_PHONE
    (171, 0x183), // KEY_CONFIG
    (172, 0x223), // KEY_HOMEPAGE
    (173, 0x227), // KEY_REFRESH
    (174, 0x204), // KEY_EXIT
    (176, 0x185), // KEY_EDIT
    (177, 0x234), // KEY_SCROLLUP
    (178, 0x235), // KEY_SCROLLDOWN
    (181, 0x201), // KEY_NEW
    (182, 0x279), // KEY_REDO
    (200, 0x0B0), // KEY_PLAYCD
    (201, 0x0B1), // KEY_PAUSECD
    (205, 0x034), // KEY_SUSPEND
    (206, 0x203), // KEY_CLOSE
    (207, 0x0B0), // KEY_PLAY
    (208, 0x0B3), // KEY_FASTFORWARD
    (209, 0x0E5), // KEY_BASSBOOST
    (210, 0x208), // KEY_PRINT
    (212, 0x065), // KEY_CAMERA
    (215, 0x18A), // KEY_EMAIL
    (216, 0x199), // KEY_CHAT
    (217, 0x221), // KEY_SEARCH
    (219, 0x191), // KEY_FINANCE
    (223, 0x25F), // KEY_CANCEL
    (224, 0x070), // KEY_BRIGHTNESSDOWN
    (225, 0x06F), // KEY_BRIGHTNESSUP
    (226, 0x193), // KEY_MEDIA
    (228, 0x07C), // KEY_KBDILLUMTOGGLE
    (229, 0x07A), // KEY_KBDILLUMDOWN
    (230, 0x079), // KEY_KBDILLUMUP
    (231, 0x28C), // KEY_SEND
    (232, 0x289), // KEY_REPLY
    (233, 0x28B), // KEY_FORWARDMAIL
    (234, 0x207), // KEY_SAVE
    (235, 0x1A7), // KEY_DOCUMENTS
    (241, 0x082), // KEY_VIDEO_NEXT
    (243, 0x072), // KEY_BRIGHTNESS_CYCLE
    (244, 0x075), // KEY_BRIGHTNESS_AUTO
    (353, 0x041), // KEY_SELECT
    (354, 0x222), // KEY_GOTO
    (356, 0x030), // KEY_POWER2
    (358, 0x060), // KEY_INFO
    (362, 0x08D), // KEY_PROGRAM
    (363, 0x086), // KEY_CHANNEL
    (364, 0x182), // KEY_FAVORITES
    (366, 0x09A), // KEY_PVR
    (370, 0x061), // KEY_SUBTITLE
    (372, 0x06D), // KEY_ZOOM
    (374, 0x1AE), // KEY_KEYBOARD
    (376, 0x088), // KEY_PC
    (377, 0x089), // KEY_TV
    (378, 0x097), // KEY_TV2
    (379, 0x092), // KEY_VCR
    (380, 0x0A0), // KEY_VCR2
    (381, 0x098), // KEY_SAT
    (383, 0x091), // KEY_CD
    (384, 0x096), // KEY_TAPE
    (386, 0x093), // KEY_TUNER
    (389, 0x08B), // KEY_DVD
    (391, 0x193), // KEY_MP3
    (392, 0x1B7), // KEY_AUDIO
    (393, 0x1B8), // KEY_VIDEO
    (396, 0x090), // KEY_MEMO
    (397, 0x18E), // KEY_CALENDAR
    (398, 0x069), // KEY_RED
    (399, 0x06A), // KEY_GREEN
    (400, 0x06C), // KEY_YELLOW
    (401, 0x06B), // KEY_BLUE
    (402, 0x09C), // KEY_CHANNELUP
    (403, 0x09D), // KEY_CHANNELDOWN
    (405, 0x083), // KEY_LAST
    (408, 0x031), // KEY_RESTART
    (409, 0x0F5), // KEY_SLOW
    (410, 0x0B9), // KEY_SHUFFLE
    (418, 0x22D), // KEY_ZOOMIN
    (419, 0x22E), // KEY_ZOOMOUT
    (420, 0x22F), // KEY_ZOOMRESET
    (421, 0x184), // KEY_WORDPROCESSOR
    (422, 0x185), // KEY_EDITOR
    (423, 0x186), // KEY_SPREADSHEET
    (424, 0x187), // KEY_GRAPHICSEDITOR
    (425, 0x188), // KEY_PRESENTATION
    (426, 0x189), // KEY_DATABASE
    (427, 0x18B), // KEY_NEWS
    (428, 0x18C), // KEY_VOICEMAIL
    (429, 0x18D), // KEY_ADDRESSBOOK
    (430, 0x1BC), // KEY_MESSENGER
    (431, 0x072), // KEY_DISPLAYTOGGLE
    (432, 0x1AB), // KEY_SPELLCHECK
    (433, 0x19C), // KEY_LOGOFF
    (439, 0x0BC), // KEY_MEDIA_REPEAT
    (440, 0x1B6), // KEY_IMAGES
    (580, 0x1A2), // KEY_APPSELECT
    (582, 0x0CF), // KEY_VOICECOMMAND
    (583, 0x1CB), // KEY_ASSISTANT
    (592, 0x073), // KEY_BRIGHTNESS_MIN
    (593, 0x074), // KEY_BRIGHTNESS_MAX
];

// ── Tests ─────────────────────────────────────────────────────────────────────
