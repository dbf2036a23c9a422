//! User-facing messages. The client is Arabic-first, so these are returned
//! verbatim in response bodies.

pub const INVALID_PHONE: &str = "رقم الهاتف غير صحيح";
pub const PATIENT_NOT_FOUND: &str = "المريض غير موجود";
pub const DOCTOR_NOT_FOUND: &str = "الطبيب غير موجود";
pub const SESSION_NOT_FOUND: &str = "الجلسة غير موجودة";
pub const UNAUTHORIZED: &str = "غير مصرح";
pub const FORBIDDEN: &str = "ممنوع";
pub const INTERNAL_ERROR: &str = "خطأ داخلي";

pub const ANONYMOUS_ID_FAILED: &str = "فشل في إنشاء الهوية المجهولة";
pub const DOCTORS_FETCH_FAILED: &str = "فشل في جلب قائمة الأطباء";
pub const FREE_SESSION_ALREADY_USED: &str = "لقد استخدمت الجلسة المجانية بالفعل";
pub const BOOKING_FAILED: &str = "فشل في حجز الجلسة";
pub const PAYMENT_SESSION_FAILED: &str = "فشل في إنشاء جلسة الدفع";
pub const INVALID_BOOKING_REQUEST: &str = "بيانات الحجز غير صحيحة";
pub const PAYMENT_REQUIRED: &str = "لم يتم الدفع لهذه الجلسة بعد";
pub const CONSENT_REQUIRED: &str = "يجب الموافقة على سياسة الخصوصية وشروط الاستخدام";
pub const CONSENT_FAILED: &str = "فشل في حفظ الموافقة";
pub const INVALID_SESSION_STATE: &str = "لا يمكن تنفيذ هذا الإجراء على الجلسة في حالتها الحالية";

pub const FREE_SESSION_BOOKED: &str = "تم حجز الجلسة المجانية بنجاح";
pub const PAYMENT_SESSION_CREATED: &str = "تم إنشاء جلسة الدفع بنجاح";
pub const SESSION_COMPLETED: &str = "تمت الجلسة بنجاح";
pub const NOTES_SAVED: &str = "تم حفظ الملاحظات";
pub const CONSENT_RECORDED: &str = "تم تسجيل الموافقة";
