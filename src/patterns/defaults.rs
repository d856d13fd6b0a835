// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in lists.  Entries are regular-expression fragments joined with `|`.

/// Search engines, social previewers, SEO tools and feed readers.
pub const BOT_SIGNATURES: &[&str] = &[
    r"\.net crawler", "360spider", r"50\.nu", "8bo crawler bot", "aboundex", "accoona",
    "adldxbot", "adsbot-google", "ahrefsbot", "altavista", "appengine-google", "applebot",
    "archiver", "arielisbot", "ask jeeves", "auskunftbot", "baidumobaider", "baiduspider",
    "becomebot", "bingbot", "bingpreview", "bitbot", "bitlybot", "blitzbot", "blogbridge",
    "boardreader", "botseer", "catchbot", "catchpoint bot", "charlotte", "checklinks",
    "cliqzbot", "clumboot", "coccocbot", "converacrawler", "crawl-e", "crawlconvera",
    "dataparksearch", "daum", "deusu", r"developers\.google\.com/+/web/snippet",
    "discordbot", "dotbot", "duckduckbot", "elefent", "embedly", "evernote", "exabot",
    "facebookbot", "facebookexternalhit", "fatbot", "fdse robot", "feed seeker bot",
    "feedfetcher", "femtosearchbot", "findlinks", "flamingo_searchengine", "flipboard",
    "followsite bot", "furlbot", "fyberspider", "gaisbot", "galaxybot", "geniebot",
    "genieo", "gigablast", "gigabot", "girafabot", "gomezagent", "gonzo1",
    "google sketchup", "google-structured-data-testing-tool", "googlebot", "haosouspider",
    "heritrix", "holmes", "hoowwwer", "htdig", "ia_archiver", "idbot", "infuzapp",
    "innovazion crawler", "internetarchive", "iqdb", "iskanie", "istellabot",
    r"izsearch\.com", "kaloogabot", r"kaz\.kz_bot", "kd bot", "konqueror", "kraken",
    "kurzor", "larbin", "leia", "lesnikbot", "linguee bot", "linkaider", "linkapediabot",
    "linkedinbot", "lite bot", "llaut", "lookseek", "lycos", r"mail\.ru_bot",
    "masidani_bot", "masscan", "mediapartners-google", "metajobbot", "mj12bot",
    "mnogosearch", "mogimogi", "mojeekbot", "motominerbot", "mozdex", "msiecrawler",
    "msnbot", "msrbot", "netpursual", "netresearch", "netvibes", "newsgator", "ng-search",
    "nicebot", "nutchcvs", "nuzzel", "nymesis", "objectssearch", "odklbot", "omgili",
    "oovoo", "oozbot", "openfosbot", "orangebot", "orbiter", "org_bot", "outbrain",
    "pagepeeker", "pagesinventory", "parsijoobot", "paxleframework",
    "peeplo screenshot bot", "pinterest", "plantynet_webrobot", "plukkie", "pompos",
    "psbot", "quora link preview", "qwantify", "read%20later", "reaper", "redcarpet",
    "redditbot", "retreiver", "riddler", "rival iq", "rogerbot", "saucenao", "scooter",
    "scrapy", "scrubby", "searchie", "searchsight", "seekbot", "semanticdiscovery",
    "seznambot", "showyoubot", "simplepie", "simpy", "sitelockspider", "skypeuripreview",
    "slack-imgproxy", "slackbot", "slurp", "snappy", "sogou", "solofield", "speedy spider",
    "speedyspider", "sputnikbot", "stackrambler", "teeraidbot", "teoma", "theusefulbot",
    r"thumbshots\.ru", "thumbshotsbot", "tineye", r"toweya\.com", "toweyabot", "tumblr",
    "tweetedtimes", "tweetmemebot", "twitterbot", "url2png", "vagabondo", "vebidoobot",
    "viber", "visionutils", "vkshare", "voilabot", "vortex", "votay bot", "voyager",
    "w3c_validator", r"wasalive\.bot", "web-sniffer", r"websquash\.com", "webthumb",
    "whatsapp", "whatweb", "wire", "wotbox", "yacybot", "yahoo", "yandex", "yeti",
    "yisouspider", "yodaobot", "yooglifetchagent", "yoozbot", "yottaamonitor", "yowedo",
    "zao-crawler", r"zebot_www\.ze\.bz", "zooshot", "zyborg",
];

/// Transport, hop-by-hop and fingerprinting headers never copied from the
/// rendering service to the client.
pub const IGNORED_HEADERS: &[&str] = &[
    "age", "alt-svc", "cache-status", "cf-connecting-ip", "cf-ipcountry", "cf-cache-status",
    "cf-ray", "cf-request-id", "cnection", "cneonction", "connection", "content-encoding",
    "content-length", "date", "etag", "expect-ct", "expires", "keep-alive", "last-modified",
    "link", "nel", "nncoection", "pragma", "server", "set-cookie", "status",
    "transfer-encoding", "report-to", "vary", "via", "www-authenticate",
    "x-accel-buffering", "x-accel-charset", "x-accel-expires", "x-accel-limit-rate",
    "x-accel-redirect", "x-ostrio-domain", "x-powered-by", "x-preprender-status",
    "x-prerender-status", "x-real-ip", "x-runtime",
];

/// File extensions that are never rendered.
pub const STATIC_EXTENSIONS: &[&str] = &[
    "3ds", "3g2", "3gp", "3gpp", "7z", "a", "aac", "aaf", "adp", "ai", "aif", "aiff", "alz",
    "ape", "apk", "appcache", "ar", "arj", "asf", "asx", "atom", "au", "avchd", "avi",
    "bak", "bbaw", "bh", "bin", "bk", "bmp", "btif", "bz2", "bzip2", "cab", "caf", "cco",
    "cgm", "class", "cmx", "cpio", "cr2", "crt", "crx", "css", "csv", "cur", "dat", "deb",
    "der", "dex", "djvu", "dll", "dmg", "dng", "doc", "docm", "docx", "dot", "dotm", "dra",
    "drc", "DS_Store", "dsk", "dts", "dtshd", "dvb", "dwg", "dxf", "ear", "ecelp4800",
    "ecelp7470", "ecelp9600", "egg", "eol", "eot", "eps", "epub", "exe", "f4a", "f4b",
    "f4p", "f4v", "fbs", "fh", "fla", "flac", "fli", "flv", "fpx", "fst", "fvt", "g3",
    "geojson", "gif", "graffle", "gz", "gzip", "h261", "h263", "h264", "hqx", "htc", "ico",
    "ief", "img", "ipa", "iso", "jad", "jar", "jardiff", "jng", "jnlp", "jpeg", "jpg",
    "jpgv", "jpm", "js", "jxr", "key", "kml", "kmz", "ktx", "less", "lha", "lvp", "lz",
    "lzh", "lzma", "lzo", "m2v", "m3u", "m4a", "m4p", "m4v", "map", "manifest", "mar",
    "markdown", "md", "mdi", "mdown", "mdwn", "mht", "mid", "midi", "mj2", "mka", "mkd",
    "mkdn", "mkdown", "mkv", "mml", "mmr", "mng", "mobi", "mov", "movie", "mp2", "mp3",
    "mp4", "mp4a", "mpe", "mpeg", "mpg", "mpga", "mpv", "msi", "msm", "msp", "mxf", "mxu",
    "nef", "npx", "nsv", "numbers", "o", "oex", "oga", "ogg", "ogv", "opus", "otf", "pages",
    "pbm", "pcx", "pdb", "pdf", "pea", "pem", "pgm", "pic", "pl", "pm", "png", "pnm", "pot",
    "potm", "potx", "ppa", "ppam", "ppm", "pps", "ppsm", "ppsx", "ppt", "pptm", "pptx",
    "prc", "ps", "psd", "pya", "pyc", "pyo", "pyv", "qt", "ra", "rar", "ras", "raw", "rdf",
    "rgb", "rip", "rlc", "rm", "rmf", "rmvb", "ron", "roq", "rpm", "rss", "rtf", "run",
    "rz", "s3m", "s7z", "safariextz", "scpt", "sea", "sgi", "shar", "sil", "sit", "slk",
    "smv", "so", "sub", "svg", "svgz", "svi", "swf", "tar", "tbz", "tbz2", "tcl", "tga",
    "tgz", "thmx", "tif", "tiff", "tk", "tlz", "topojson", "torrent", "ttc", "ttf", "txt",
    "txz", "udf", "uvh", "uvi", "uvm", "uvp", "uvs", "uvu", "vcard", "vcf", "viv", "vob",
    "vtt", "war", "wav", "wax", "wbmp", "wdp", "weba", "webapp", "webm", "webmanifest",
    "webp", "whl", "wim", "wm", "wma", "wml", "wmlc", "wmv", "wmx", "woff", "woff2", "wvx",
    "xbm", "xif", "xla", "xlam", "xloc", "xls", "xlsb", "xlsm", "xlsx", "xlt", "xltm",
    "xltx", "xm", "xmind", "xml", "xpi", "xpm", "xsl", "xwd", "xz", "yuv", "z", "zip",
    "zipx",
];
